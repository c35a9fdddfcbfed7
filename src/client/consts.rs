pub const RUNPOD_API_KEY: &str = "RUNPOD_API_KEY";
pub const RUNPOD_ENDPOINT_ID: &str = "RUNPOD_ENDPOINT_ID";
pub const RUNPOD_BASE_URL: &str = "RUNPOD_BASE_URL";

pub const BASE_URL: &str = "https://api.runpod.ai/v2";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_GREETING: &str = "Hi! I'm your AI assistant. How can I help you today?";
