use karma_errors::AppError;
use regex_lite::Regex;
use std::sync::LazyLock;

const PASSWORD_MIN_CHARS: usize = 6;
const PASSWORD_MAX_CHARS: usize = 16;

static NICKNAME: LazyLock<Regex> = LazyLock::new(|| compile(r"^[a-zA-Z0-9_-]{4,12}$"));
static NAME: LazyLock<Regex> = LazyLock::new(|| compile(r"^[a-zA-Z]{3,16}$"));
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
});
static PASSWORD_UPPER: LazyLock<Regex> = LazyLock::new(|| compile(r"[A-Z]"));
static PASSWORD_DIGIT: LazyLock<Regex> = LazyLock::new(|| compile(r"\d"));
static PASSWORD_SPECIAL: LazyLock<Regex> = LazyLock::new(|| compile(r"[\W_]"));

fn compile(pattern: &str) -> Regex {
    // Patterns are literals above; a failure here is a programming error.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid pattern {pattern}: {e}"))
}

pub struct InputValidator;

impl InputValidator {
    pub fn is_valid_nickname(s: &str) -> bool {
        NICKNAME.is_match(s)
    }

    pub fn is_valid_name(s: &str) -> bool {
        NAME.is_match(s)
    }

    pub fn is_valid_email(s: &str) -> bool {
        EMAIL.is_match(s)
    }

    pub fn is_valid_password(s: &str) -> bool {
        let chars = s.chars().count();
        (PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&chars)
            && PASSWORD_UPPER.is_match(s)
            && PASSWORD_DIGIT.is_match(s)
            && PASSWORD_SPECIAL.is_match(s)
    }

    pub fn check(valid: bool, message: &str) -> Result<(), AppError> {
        if valid {
            Ok(())
        } else {
            tracing::debug!("Rejected input: {}", message);
            Err(AppError::Validation(message.to_string()))
        }
    }
}
