/*!
 * Common test utilities for the narrasync test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use narrasync::providers::mock::{MockGenerator, MockSynthesizer};
use narrasync::Backends;

/// A story with paragraphs, explicit sentences, a break, emphasis and a mark
pub const SAMPLE_STORY: &str = r#"<speak>
<p><s>The lantern flickered twice.</s><s>Nobody moved.</s></p>
<break time="1s"/>
<p><s>Then <emphasis level="strong">something</emphasis> <mark name="knock"/>knocked.</s></p>
</speak>"#;

/// Markup the generator sometimes returns: closing root tag cut off
pub const TRUNCATED_STORY: &str = "<speak><p><s>Tom &amp; Jerry ran.</s><s>They hid.</s></p>";

/// Install a test logger once; repeated calls are ignored
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Backends that never touch the network
pub fn mock_backends() -> Backends {
    Backends::new(Arc::new(MockGenerator::working()), Arc::new(MockSynthesizer::working()))
}

/// Mock backends with a specific synthesizer
pub fn backends_with_synthesizer(synthesizer: MockSynthesizer) -> Backends {
    Backends::new(Arc::new(MockGenerator::working()), Arc::new(synthesizer))
}
