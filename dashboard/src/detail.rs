//! Detail view workflow for a single booking: load, edit, delete.
//!
//! Responses that arrive after the view has been unmounted are dropped, and
//! only one mutation may be in flight per view.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use abi::{
    BookingDetails, BookingDraft, BookingId, BookingStatus, Error, FieldError, ServiceRef,
};
use booking::{Bookings, Services};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loading,
    Loaded,
    Editing {
        draft: BookingDraft,
        errors: Vec<FieldError>,
        submit_error: Option<String>,
    },
    ConfirmingDelete,
    Error(String),
    Deleted,
}

/// What a submit or delete ended in, as far as the view is concerned.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    Saved,
    /// The booking is gone; the caller navigates back to the list.
    Deleted { id: BookingId },
    /// Client side validation failed, nothing was sent.
    Invalid(Vec<FieldError>),
    Failed { message: String },
    /// The view was unmounted before the store answered.
    Stale,
}

/// Shared liveness and busy flags of a mounted view.
#[derive(Debug, Clone, Default)]
pub struct ViewHandle {
    unmounted: Arc<AtomicBool>,
    busy: Arc<AtomicBool>,
}

impl ViewHandle {
    pub fn unmount(&self) {
        self.unmounted.store(true, Ordering::Release);
    }

    pub fn is_mounted(&self) -> bool {
        !self.unmounted.load(Ordering::Acquire)
    }

    /// true while a mutation is in flight; controls should be disabled
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Holds the busy flag for the lifetime of one mutation.
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, Error> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(Self(flag.clone()))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct BookingDetail<S> {
    store: Arc<S>,
    id: BookingId,
    state: DetailState,
    details: Option<BookingDetails>,
    handle: ViewHandle,
}

/// Fetch a booking with its relations, then resolve its services. A list of
/// ids takes precedence over the single id.
pub async fn fetch_details<S>(store: &S, id: BookingId) -> Result<BookingDetails, Error>
where
    S: Bookings + Services + ?Sized,
{
    let found = store.fetch_booking_with_relations(id).await?;
    let services = match &found.booking.services {
        ServiceRef::Many(ids) => store.fetch_services_by_ids(ids).await?,
        ServiceRef::Single(service_id) => match store.fetch_service(*service_id).await {
            Ok(service) => vec![service],
            Err(Error::NotFound { .. }) => {
                warn!(booking = id, service = service_id, "booked service no longer exists");
                vec![]
            }
            Err(e) => return Err(e),
        },
    };
    Ok(found.with_services(services))
}

impl<S: Bookings + Services> BookingDetail<S> {
    pub fn new(store: Arc<S>, id: BookingId) -> Self {
        Self {
            store,
            id,
            state: DetailState::Loading,
            details: None,
            handle: ViewHandle::default(),
        }
    }

    pub fn handle(&self) -> ViewHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn details(&self) -> Option<&BookingDetails> {
        self.details.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.state == DetailState::Loading
    }

    /// Load or reload. Earlier details stay visible until the new ones arrive.
    pub async fn load(&mut self) -> Result<(), Error> {
        self.state = DetailState::Loading;
        let result = fetch_details(self.store.as_ref(), self.id).await;

        if !self.handle.is_mounted() {
            warn!(id = self.id, "dropping booking response for unmounted view");
            return Ok(());
        }

        match result {
            Ok(details) => {
                self.details = Some(details);
                self.state = DetailState::Loaded;
                Ok(())
            }
            Err(e) => {
                self.state = DetailState::Error(e.to_string());
                Err(e)
            }
        }
    }

    pub fn begin_edit(&mut self) -> Result<(), Error> {
        let details = match (&self.state, &self.details) {
            (DetailState::Loaded, Some(details)) => details,
            _ => return Err(Error::InvalidState("booking is not loaded")),
        };
        self.state = DetailState::Editing {
            draft: BookingDraft::from_booking(&details.booking),
            errors: vec![],
            submit_error: None,
        };
        Ok(())
    }

    pub fn draft_mut(&mut self) -> Option<&mut BookingDraft> {
        match &mut self.state {
            DetailState::Editing { draft, .. } => Some(draft),
            _ => None,
        }
    }

    /// Leave edit mode, discarding the draft.
    pub fn cancel_edit(&mut self) {
        if matches!(self.state, DetailState::Editing { .. }) {
            self.state = DetailState::Loaded;
        }
    }

    /// Validate the draft and send the changed fields. A successful save
    /// reloads the booking and closes the form; a failed one keeps both the
    /// draft and the previously loaded data.
    pub async fn submit_edit(&mut self) -> Result<MutationOutcome, Error> {
        let (draft, original) = match (&self.state, &self.details) {
            (DetailState::Editing { draft, .. }, Some(details)) => {
                (draft.clone(), details.booking.clone())
            }
            _ => return Err(Error::InvalidState("booking is not being edited")),
        };

        let invalid = draft.validate();
        if !invalid.is_empty() {
            if let DetailState::Editing {
                errors,
                submit_error,
                ..
            } = &mut self.state
            {
                *errors = invalid.clone();
                *submit_error = None;
            }
            return Ok(MutationOutcome::Invalid(invalid));
        }

        let patch = draft.to_patch(&original);
        if patch.is_empty() {
            self.state = DetailState::Loaded;
            return Ok(MutationOutcome::Saved);
        }

        let _busy = BusyGuard::acquire(&self.handle.busy)?;
        let result = self.store.update_booking(self.id, patch).await;
        if !self.handle.is_mounted() {
            return Ok(MutationOutcome::Stale);
        }

        match result {
            Ok(_) => {
                info!(id = self.id, "booking updated");
                if let Err(e) = self.load().await {
                    warn!(id = self.id, error = %e, "reload after update failed");
                }
                Ok(MutationOutcome::Saved)
            }
            Err(e) => {
                let message = e.to_string();
                if let DetailState::Editing {
                    errors,
                    submit_error,
                    ..
                } = &mut self.state
                {
                    errors.clear();
                    *submit_error = Some(message.clone());
                }
                Ok(MutationOutcome::Failed { message })
            }
        }
    }

    /// Quick status change from the detail view, e.g. check in or check out.
    pub async fn set_status(&mut self, status: BookingStatus) -> Result<MutationOutcome, Error> {
        if self.state != DetailState::Loaded {
            return Err(Error::InvalidState("booking is not loaded"));
        }

        let _busy = BusyGuard::acquire(&self.handle.busy)?;
        let result = self.store.update_status(self.id, status).await;
        if !self.handle.is_mounted() {
            return Ok(MutationOutcome::Stale);
        }

        match result {
            Ok(_) => {
                info!(id = self.id, %status, "booking status changed");
                if let Err(e) = self.load().await {
                    warn!(id = self.id, error = %e, "reload after status change failed");
                }
                Ok(MutationOutcome::Saved)
            }
            Err(e) => Ok(MutationOutcome::Failed {
                message: e.to_string(),
            }),
        }
    }

    pub fn request_delete(&mut self) -> Result<(), Error> {
        if self.state != DetailState::Loaded {
            return Err(Error::InvalidState("booking is not loaded"));
        }
        self.state = DetailState::ConfirmingDelete;
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        if self.state == DetailState::ConfirmingDelete {
            self.state = DetailState::Loaded;
        }
    }

    pub async fn confirm_delete(&mut self) -> Result<MutationOutcome, Error> {
        if self.state != DetailState::ConfirmingDelete {
            return Err(Error::InvalidState("delete was not requested"));
        }

        let _busy = BusyGuard::acquire(&self.handle.busy)?;
        let result = self.store.delete_booking(self.id).await;
        if !self.handle.is_mounted() {
            return Ok(MutationOutcome::Stale);
        }

        match result {
            Ok(()) => {
                info!(id = self.id, "booking deleted");
                self.details = None;
                self.state = DetailState::Deleted;
                Ok(MutationOutcome::Deleted { id: self.id })
            }
            Err(e) => {
                self.state = DetailState::Loaded;
                Ok(MutationOutcome::Failed {
                    message: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_guard_should_release_on_drop() {
        let handle = ViewHandle::default();
        {
            let _guard = BusyGuard::acquire(&handle.busy).unwrap();
            assert!(handle.is_busy());
            assert_eq!(BusyGuard::acquire(&handle.busy).err(), Some(Error::Busy));
        }
        assert!(!handle.is_busy());
    }

    #[test]
    fn unmount_should_be_seen_by_clones() {
        let handle = ViewHandle::default();
        let other = handle.clone();
        assert!(other.is_mounted());
        handle.unmount();
        assert!(!other.is_mounted());
    }
}
