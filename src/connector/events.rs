//! Per-transfer event dispatch.

use crate::transfer::{
    RequestType, TransferCancelled, TransferError, TransferEvent, TransferEventType,
    TransferListener, TransferResource,
};
use crate::transport::TransferMonitor;

/// Emits the event stream of one transfer and tracks its byte count.
pub(crate) struct EventSink<'a> {
    listener: Option<&'a dyn TransferListener>,
    request_type: RequestType,
    resource: TransferResource,
    transferred: u64,
}

impl<'a> EventSink<'a> {
    pub(crate) fn new(
        listener: Option<&'a dyn TransferListener>,
        request_type: RequestType,
        resource: TransferResource,
    ) -> Self {
        Self {
            listener,
            request_type,
            resource,
            transferred: 0,
        }
    }

    pub(crate) fn resource(&self) -> &TransferResource {
        &self.resource
    }

    fn event<'e>(
        &'e self,
        event_type: TransferEventType,
        data: &'e [u8],
        error: Option<&'e TransferError>,
    ) -> TransferEvent<'e> {
        TransferEvent {
            event_type,
            request_type: self.request_type,
            resource: &self.resource,
            transferred_bytes: self.transferred,
            data,
            error,
        }
    }

    pub(crate) fn initiated(&mut self) -> Result<(), TransferCancelled> {
        match self.listener {
            Some(l) => l.transfer_initiated(&self.event(TransferEventType::Initiated, &[], None)),
            None => Ok(()),
        }
    }

    pub(crate) fn corrupted(&mut self, error: &TransferError) -> Result<(), TransferCancelled> {
        match self.listener {
            Some(l) => l.transfer_corrupted(&self.event(
                TransferEventType::Corrupted,
                &[],
                Some(error),
            )),
            None => Ok(()),
        }
    }

    pub(crate) fn succeeded(&self) {
        if let Some(l) = self.listener {
            l.transfer_succeeded(&self.event(TransferEventType::Succeeded, &[], None));
        }
    }

    pub(crate) fn failed(&self, error: &TransferError) {
        if let Some(l) = self.listener {
            l.transfer_failed(&self.event(TransferEventType::Failed, &[], Some(error)));
        }
    }
}

impl TransferMonitor for EventSink<'_> {
    fn started(&mut self, content_length: Option<u64>) -> Result<(), TransferCancelled> {
        self.transferred = 0;
        if content_length.is_some() {
            self.resource.content_length = content_length;
        }
        match self.listener {
            Some(l) => l.transfer_started(&self.event(TransferEventType::Started, &[], None)),
            None => Ok(()),
        }
    }

    fn progressed(&mut self, data: &[u8]) -> Result<(), TransferCancelled> {
        self.transferred += data.len() as u64;
        match self.listener {
            Some(l) => l.transfer_progressed(&self.event(TransferEventType::Progressed, data, None)),
            None => Ok(()),
        }
    }
}
