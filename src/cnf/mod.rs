use std::sync::LazyLock;

/// How many identifiers a cached sequence reserves with each persisted block (defaults to 1024)
pub static SEQUENCE_BATCH_SIZE: LazyLock<u64> =
	lazy_env_parse!("TRANSLATE_SEQUENCE_BATCH_SIZE", u64, 1024);

/// The maximum number of writes buffered in a single in-memory transaction (defaults to 100,000)
pub static MEMORY_MAX_TRANSACTION_ENTRIES: LazyLock<usize> =
	lazy_env_parse!("TRANSLATE_MEMORY_MAX_TRANSACTION_ENTRIES", usize, 100_000);

/// The maximum number of bytes buffered in a single in-memory transaction (defaults to 64 MiB)
pub static MEMORY_MAX_TRANSACTION_SIZE: LazyLock<usize> =
	lazy_env_parse!("TRANSLATE_MEMORY_MAX_TRANSACTION_SIZE", usize, 64 << 20);

/// How many times a conflicting transaction is retried before giving up (defaults to 16)
pub static TRANSACTION_RETRY_LIMIT: LazyLock<u32> =
	lazy_env_parse!("TRANSLATE_TRANSACTION_RETRY_LIMIT", u32, 16);

/// The upper bound, in milliseconds, of the backoff between conflict retries (defaults to 512)
pub static TRANSACTION_RETRY_MAX_BACKOFF: LazyLock<u64> =
	lazy_env_parse!("TRANSLATE_TRANSACTION_RETRY_MAX_BACKOFF", u64, 512);
