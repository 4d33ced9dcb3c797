//! Per-call resources bound to a [`ConnectionHandle`].
//!
//! A [`ScopedAttachment`] attaches its resource on construction and detaches
//! it when dropped, on every exit path. Guards nest through `DerefMut`, so a
//! call can stack cookie file, form and header list and still reach the
//! handle. Detach failures are logged, never returned.

use crate::base::neterror::NetError;
use crate::cookies::persistence::{load_cookies, save_cookies};
use crate::http::multipart::Form;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::requestbody::RequestBody;
use crate::transfer::handle::ConnectionHandle;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// A resource that can be bound to a handle for one call.
pub trait Attachment {
    /// Name used in cleanup diagnostics.
    const NAME: &'static str;

    /// Bind the resource. On error nothing is left attached.
    fn attach(self, handle: &mut ConnectionHandle) -> Result<(), NetError>;

    /// Restore the handle's default state.
    fn detach(handle: &mut ConnectionHandle) -> Result<(), NetError>;
}

/// Guard keeping `A` attached for its lifetime.
pub struct ScopedAttachment<'h, A: Attachment> {
    handle: &'h mut ConnectionHandle,
    _resource: PhantomData<A>,
}

impl<'h, A: Attachment> ScopedAttachment<'h, A> {
    pub fn new(handle: &'h mut ConnectionHandle, resource: A) -> Result<Self, NetError> {
        resource.attach(handle)?;
        Ok(Self {
            handle,
            _resource: PhantomData,
        })
    }
}

impl<A: Attachment> Deref for ScopedAttachment<'_, A> {
    type Target = ConnectionHandle;

    fn deref(&self) -> &ConnectionHandle {
        self.handle
    }
}

impl<A: Attachment> DerefMut for ScopedAttachment<'_, A> {
    fn deref_mut(&mut self) -> &mut ConnectionHandle {
        self.handle
    }
}

impl<A: Attachment> Drop for ScopedAttachment<'_, A> {
    fn drop(&mut self) {
        if let Err(e) = A::detach(self.handle) {
            tracing::warn!(attachment = A::NAME, error = %e, "failed to detach");
        }
    }
}

/// Request header list.
#[derive(Debug)]
pub struct HeaderList(pub OrderedHeaderMap);

impl Attachment for HeaderList {
    const NAME: &'static str = "header list";

    fn attach(self, handle: &mut ConnectionHandle) -> Result<(), NetError> {
        handle.headers = Some(self.0);
        Ok(())
    }

    fn detach(handle: &mut ConnectionHandle) -> Result<(), NetError> {
        handle.headers = None;
        Ok(())
    }
}

/// Multipart form payload.
#[derive(Debug)]
pub struct MimeForm(pub Form);

impl Attachment for MimeForm {
    const NAME: &'static str = "multipart form";

    fn attach(self, handle: &mut ConnectionHandle) -> Result<(), NetError> {
        handle.body = RequestBody::Form(self.0);
        handle.set_post();
        Ok(())
    }

    fn detach(handle: &mut ConnectionHandle) -> Result<(), NetError> {
        handle.body = RequestBody::Empty;
        Ok(())
    }
}

/// Cookie-jar file: merged into the handle's store on attach when it exists,
/// rewritten from the store on detach.
#[derive(Debug, Default)]
pub struct CookieFile;

impl Attachment for CookieFile {
    const NAME: &'static str = "cookie file";

    fn attach(self, handle: &mut ConnectionHandle) -> Result<(), NetError> {
        let path = handle.cookie_jar_path().to_path_buf();
        if path.is_file() {
            if let Err(e) = load_cookies(handle.cookies(), &path) {
                tracing::warn!(path = %path.display(), error = %e, "could not read cookie jar");
            }
        }
        handle.cookie_file = Some(path);
        Ok(())
    }

    fn detach(handle: &mut ConnectionHandle) -> Result<(), NetError> {
        let Some(path) = handle.cookie_file.take() else {
            return Ok(());
        };
        save_cookies(handle.cookies(), &path).map_err(|source| NetError::FileWrite { path, source })
    }
}
