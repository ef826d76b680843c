//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when reducers build `Effect` values,
//! particularly async backend calls and cancellable scan tasks.

/// Create an `Effect::Future` from an async block body
///
/// # Example
///
/// ```rust,ignore
/// use puerta_core::async_effect;
///
/// async_effect! {
///     let status = permissions.request().await;
///     Some(ScanAction::PermissionResolved { status })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use puerta_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(30),
///     action: ScanAction::CloseCamera
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

/// Create an `Effect::Cancellable` wrapping an async block body
///
/// # Example
///
/// ```rust,ignore
/// use puerta_core::cancellable_effect;
///
/// cancellable_effect! {
///     id: scan_id.effect_id(),
///     {
///         let verdict = validate(api, payload).await;
///         Some(ScanAction::ScanCompleted { scan_id, verdict })
///     }
/// }
/// ```
#[macro_export]
macro_rules! cancellable_effect {
    (
        id: $id:expr,
        { $($body:tt)* }
    ) => {
        $crate::effect::Effect::Cancellable {
            id: $id,
            effect: ::std::boxed::Box::new($crate::async_effect! { $($body)* }),
        }
    };
}
