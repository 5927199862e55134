#[derive(Debug, thiserror::Error)]
pub enum HvacError {
    #[error("Failed to drive {relay} relay: {message}")]
    Pin {
        relay: &'static str,
        message: String,
    },

    #[error("Self test failed at \"{step}\": {relay} should be {expected}")]
    SelfTest {
        step: &'static str,
        relay: &'static str,
        expected: bool,
    },
}
