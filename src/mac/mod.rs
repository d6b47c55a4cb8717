/// A macro that allows lazily parsing a value from the environment variable,
/// with a fallback default value if the variable is not set or parsing fails.
///
/// # Parameters
///
/// - `$key`: An expression representing the name of the environment variable.
/// - `$t`: The type of the value to be parsed.
/// - `$default`: The default value to fall back to if the environment variable is not set or
///   parsing fails.
///
/// # Return Value
///
/// A lazy static variable of type `std::sync::LazyLock`, which holds the parsed
/// value from the environment variable or the default value.
#[macro_export]
macro_rules! lazy_env_parse {
	// With no default specified
	($key:expr_2021, $t:ty) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or_default()
		})
	};
	// With a closure for the default value
	($key:expr_2021, $t:ty, || $default:expr_2021) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or_else(|| $default)
		})
	};
	// With a static expression for the default value
	($key:expr_2021, $t:ty, $default:expr_2021) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or($default)
		})
	};
}

/// Throws an unreachable error with location details
macro_rules! fail {
	($($arg:tt)+) => {
		return Err($crate::err::Error::unreachable(format_args!($($arg)*)))
	};
}

/// Returns the given error early unless the condition holds
macro_rules! ensure {
	($cond:expr_2021, $err:expr_2021 $(,)?) => {
		if !$cond {
			return Err($err);
		}
	};
}

#[cfg(test)]
mod test {
	use std::sync::LazyLock;

	use crate::err::Error;

	fn fail_func() -> Result<(), Error> {
		fail!("Reached unreachable code");
	}

	fn ensure_func(ok: bool) -> Result<(), Error> {
		ensure!(ok, Error::TxReadonly);
		Ok(())
	}

	#[test]
	fn fail_reports_location() {
		let Err(Error::Unreachable(msg)) = fail_func() else {
			panic!("expected an unreachable error");
		};
		assert!(msg.contains("mac/mod.rs"), "{msg}");
		assert!(msg.ends_with("Reached unreachable code"), "{msg}");
	}

	#[test]
	fn ensure_returns_error() {
		assert!(ensure_func(true).is_ok());
		assert!(matches!(ensure_func(false), Err(Error::TxReadonly)));
	}

	#[test]
	fn lazy_env_parse_falls_back_to_default() {
		static VALUE: LazyLock<u64> =
			lazy_env_parse!("TRANSLATE_TEST_UNSET_ENVIRONMENT_VARIABLE", u64, 42);
		assert_eq!(*VALUE, 42);
	}
}
