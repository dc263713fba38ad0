use crc32fast::Hasher;

/// Derive a stable seed from a document identifier using CRC32
pub fn document_seed(document_id: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(document_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential ID generator for nodes within a document session
///
/// Ids take the form `<seed>-<n>`. The counter only moves forward: an id
/// handed out once is never handed out again within the session, and a
/// deleted node's id stays retired.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String, // Document seed (CRC32)
    count: u32,   // Sequential counter
}

impl IdGenerator {
    pub fn for_document(document_id: &str) -> Self {
        Self {
            seed: document_seed(document_id),
            count: 0,
        }
    }

    pub fn from_seed(seed: String) -> Self {
        Self { seed, count: 0 }
    }

    /// Generate next sequential ID
    pub fn next_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    /// Get the seed this generator derives ids from
    pub fn seed(&self) -> &str {
        &self.seed
    }
}
