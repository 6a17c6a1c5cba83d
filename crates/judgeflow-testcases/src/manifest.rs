use crate::Error;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// One test case (§4.3: "ordered list of `{id, input, output}`").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub input: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TestCaseManifest {
    pub cases: Vec<TestCase>,
}

impl TestCaseManifest {
    pub fn len(&self) -> u32 {
        self.cases.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

pub(crate) fn compress(manifest: &TestCaseManifest, level: u32) -> Result<Vec<u8>, Error> {
    let json = serde_json::to_vec(&manifest.cases)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

pub(crate) fn decompress(bytes: &[u8]) -> Result<TestCaseManifest, Error> {
    let mut decoder = GzDecoder::new(bytes);
    let mut json = Vec::new();
    decoder.read_to_end(&mut json)?;
    let cases = serde_json::from_slice(&json)?;
    Ok(TestCaseManifest { cases })
}
