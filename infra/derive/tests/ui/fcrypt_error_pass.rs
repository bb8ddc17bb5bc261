use fcrypt_derive::fcrypt_error;
use std::borrow::Cow;

#[fcrypt_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Parse error{}: {source}", format_context(.context))]
    Parse {
        #[source]
        source: std::num::ParseIntError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn parse(input: &str) -> Result<u32, DemoError> {
    let value = input.parse::<u32>().context("Parsing key version")?;
    if value == 0 {
        return Err("Key version must be positive".into());
    }
    Ok(value)
}

fn main() {
    let err = parse("x").unwrap_err();
    assert!(err.to_string().starts_with("Parse error (Parsing key version)"));

    let err = parse("0").unwrap_err();
    assert_eq!(err.to_string(), "Internal error: Key version must be positive");

    let err: Result<(), DemoError> = Err(DemoError::from(String::from("boom")));
    let err = err.context("Rotating").unwrap_err();
    assert_eq!(err.to_string(), "Internal error (Rotating): boom");

    let io: DemoError = std::io::Error::other("disk").into();
    assert!(matches!(io, DemoError::Io { context: None, .. }));
}
