// Defaults for values that can be overridden from the command line or environment.

pub const APP_TITLE: &str = "HealthGenie AI";
pub const TAGLINE: &str = "Your 24/7 Personal Health Companion | Nutrition Guide | Fitness Coach";

pub const DEFAULT_PORT: u16 = 8501;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_TEMPLATES_DIR: &str = "templates";
pub const DEFAULT_STATIC_DIR: &str = "static";

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

pub const DISCLAIMER: &[&str] = &[
    "This AI provides general health information only",
    "Not a substitute for professional medical advice",
    "Always consult a real doctor for serious conditions",
    "Results may not be 100% accurate",
    "Use at your own discretion",
];
