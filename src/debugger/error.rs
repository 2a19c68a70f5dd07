use crate::debugger::address::Address;
use crate::debugger::query::QueryError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- generic errors --------------------------------------------
    #[error(transparent)]
    IO(#[from] std::io::Error),

    // --------------------------------- remote query errors ---------------------------------------
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("read name of field {1} of object {0}: {2}")]
    FieldName(Address, usize, QueryError),
    #[error("field index {1} out of bounds for object {0}")]
    FieldOutOfBounds(Address, usize),

    // --------------------------------- host debugger errors --------------------------------------
    #[error("`max children count` setting unavailable: {0}")]
    MaxChildrenSetting(QueryError),
    #[error("render interrupted")]
    Interrupted,

    // --------------------------------- snapshot errors -------------------------------------------
    #[error("heap snapshot parsing error: {0}")]
    SnapshotParsing(#[from] toml::de::Error),
}

impl Error {
    /// Return a hint to a caller - degrade to a fallback representation or abort the whole render.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::IO(_) => false,
            Error::Query(_) => false,
            Error::FieldName(_, _, _) => false,
            Error::FieldOutOfBounds(_, _) => false,
            Error::SnapshotParsing(_) => false,

            // abort current render
            Error::MaxChildrenSetting(_) => true,
            Error::Interrupted => true,
        }
    }
}

#[macro_export]
macro_rules! _error {
    ($log_fn: path, $res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "debugger", "{:#}", e);
                None
            }
        }
    };
    ($log_fn: path, $res: expr, $msg: tt) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "debugger", concat!($msg, " {:#}"), e);
                None
            }
        }
    };
}

/// Transforms `Result` into `Option` and logs an error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        $crate::_error!(log::warn, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::warn, $res, $msg)
    };
}

/// Transforms `Result` into `Option` and put error into debug logs if it occurs.
#[macro_export]
macro_rules! muted_error {
    ($res: expr) => {
        $crate::_error!(log::debug, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::debug, $res, $msg)
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        let query_err = || QueryError::Invalid("(int)foo()".to_string());

        assert!(Error::MaxChildrenSetting(query_err()).is_fatal());
        assert!(Error::Interrupted.is_fatal());
        assert!(!Error::Query(query_err()).is_fatal());
        assert!(!Error::FieldName(Address::from(0x10_u64), 1, query_err()).is_fatal());
    }

    #[test]
    fn test_weak_error_into_option() {
        let ok: Result<u32, Error> = Ok(1);
        assert_eq!(weak_error!(ok), Some(1));

        let err: Result<u32, Error> = Err(Error::Interrupted);
        assert_eq!(muted_error!(err, "render:"), None);
    }
}
