//! Convenience macros for Warden.

/// Log an event with the given level.
///
/// The message is prefixed with the calling module; optional `key => value`
/// pairs are appended as `key=value` metadata.
///
/// # Examples
///
/// ```
/// use warden_core::log_event;
/// use warden_core::utils::LogLevel;
///
/// log_event!(LogLevel::Info, "ACL created");
///
/// log_event!(LogLevel::Info, "ACL assigned",
///     acl => 1001,
///     group => 7,
/// );
/// ```
#[macro_export]
macro_rules! log_event {
    ($level:expr, $message:expr) => {
        {
            use $crate::utils::LogLevel;
            match $level {
                LogLevel::Error => log::error!("[{}] {}", module_path!(), $message),
                LogLevel::Warning => log::warn!("[{}] {}", module_path!(), $message),
                LogLevel::Info => log::info!("[{}] {}", module_path!(), $message),
                LogLevel::Debug => log::debug!("[{}] {}", module_path!(), $message),
                LogLevel::Trace => log::trace!("[{}] {}", module_path!(), $message),
            }
        }
    };

    ($level:expr, $message:expr, $($key:ident => $value:expr),+ $(,)?) => {
        {
            use $crate::utils::LogLevel;
            let metadata = vec![$(format!("{}={}", stringify!($key), $value)),+].join(" ");
            match $level {
                LogLevel::Error => log::error!("[{}] {}: {}", module_path!(), $message, metadata),
                LogLevel::Warning => log::warn!("[{}] {}: {}", module_path!(), $message, metadata),
                LogLevel::Info => log::info!("[{}] {}: {}", module_path!(), $message, metadata),
                LogLevel::Debug => log::debug!("[{}] {}: {}", module_path!(), $message, metadata),
                LogLevel::Trace => log::trace!("[{}] {}: {}", module_path!(), $message, metadata),
            }
        }
    };
}

/// Return early with a no-access error unless `$allowed` holds.
///
/// # Examples
///
/// ```
/// use warden_core::{ensure_access, Result};
/// use warden_core::error::ObjectRef;
/// use warden_core::id::ContentId;
/// use warden_core::types::Permission;
///
/// fn edit(allowed: bool) -> Result<()> {
///     ensure_access!(allowed, ObjectRef::Content(ContentId::from_raw(1)), Permission::Edit);
///     Ok(())
/// }
///
/// assert!(edit(true).is_ok());
/// assert!(edit(false).is_err());
/// ```
#[macro_export]
macro_rules! ensure_access {
    ($allowed:expr, $object:expr, $permission:expr) => {
        $crate::ensure_access!($allowed, $object, $permission, Vec::new())
    };

    ($allowed:expr, $object:expr, $permission:expr, $lacking:expr) => {
        if !$allowed {
            return Err($crate::error::AccessError::NoAccess {
                object: $object,
                permission: $permission,
                lacking: $lacking,
            }
            .into());
        }
    };
}
