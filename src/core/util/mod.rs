pub mod rate_util;
