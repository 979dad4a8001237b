use serde::{Deserialize, Serialize};

use stockledger_core::{LedgerError, LedgerResult};

stockledger_core::define_id!(
    /// Purchase document identifier.
    PurchaseDocId,
    "PurchaseDocId"
);

/// Purchase document status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Received,
    Cancelled,
}

/// One received line. The description may carry display decoration added by
/// the composing screen (a leading `[Label] ` and a trailing `(SO: ...)`
/// annotation); it is cleaned before matching against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub line_no: u32,
    pub description: String,
    pub received_qty: i64,
    /// Set once this line's stock increment and backorder clearing have
    /// committed. A receive retry after a mid-document failure skips posted
    /// lines instead of double-incrementing.
    pub posted: bool,
}

/// An inbound receipt of replenishment stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseDocument {
    id: PurchaseDocId,
    status: PurchaseStatus,
    lines: Vec<PurchaseLine>,
}

impl PurchaseDocument {
    /// Create an empty pending purchase document.
    pub fn new() -> Self {
        Self {
            id: PurchaseDocId::new(),
            status: PurchaseStatus::Pending,
            lines: Vec::new(),
        }
    }

    pub fn id(&self) -> PurchaseDocId {
        self.id
    }

    pub fn status(&self) -> PurchaseStatus {
        self.status
    }

    pub fn lines(&self) -> &[PurchaseLine] {
        &self.lines
    }

    pub fn line(&self, line_no: u32) -> Option<&PurchaseLine> {
        self.lines.iter().find(|l| l.line_no == line_no)
    }

    pub fn line_mut(&mut self, line_no: u32) -> Option<&mut PurchaseLine> {
        self.lines.iter_mut().find(|l| l.line_no == line_no)
    }

    /// Append a line while pending. Line numbers are assigned in order,
    /// starting at 1.
    pub fn add_line(
        &mut self,
        description: impl Into<String>,
        received_qty: i64,
    ) -> LedgerResult<u32> {
        if self.status != PurchaseStatus::Pending {
            return Err(LedgerError::invalid_transition(
                "cannot modify purchase lines once received or cancelled",
            ));
        }
        let description = description.into();
        if description.trim().is_empty() {
            return Err(LedgerError::validation("purchase line description cannot be empty"));
        }
        if received_qty <= 0 {
            return Err(LedgerError::validation("received quantity must be positive"));
        }

        let line_no = self.lines.len() as u32 + 1;
        self.lines.push(PurchaseLine {
            line_no,
            description,
            received_qty,
            posted: false,
        });
        Ok(line_no)
    }

    /// Guard used by the receiving engine before processing lines.
    pub fn ensure_receivable(&self) -> LedgerResult<()> {
        if self.status != PurchaseStatus::Pending {
            return Err(LedgerError::invalid_transition(
                "only pending purchase documents can be received",
            ));
        }
        if self.lines.is_empty() {
            return Err(LedgerError::validation("cannot receive document without lines"));
        }
        Ok(())
    }

    /// Move to `new_status`: pending → received, pending → cancelled only.
    /// There is no reversal of a receipt.
    pub fn transition_to(&mut self, new_status: PurchaseStatus) -> LedgerResult<()> {
        use PurchaseStatus::*;

        let allowed = matches!(
            (self.status, new_status),
            (Pending, Received) | (Pending, Cancelled)
        );
        if !allowed {
            return Err(LedgerError::invalid_transition(format!(
                "purchase document cannot move from {:?} to {:?}",
                self.status, new_status
            )));
        }

        self.status = new_status;
        Ok(())
    }
}

impl Default for PurchaseDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_line_assigns_sequential_numbers_and_starts_unposted() {
        let mut doc = PurchaseDocument::new();
        assert_eq!(doc.add_line("Bolt M6", 3).unwrap(), 1);
        assert_eq!(doc.add_line("[Shortage] Washer M6 (SO: S-0042)", 7).unwrap(), 2);

        assert!(doc.lines().iter().all(|l| !l.posted));
        assert_eq!(doc.line(2).unwrap().received_qty, 7);
        assert!(doc.line(3).is_none());
    }

    #[test]
    fn add_line_rejects_blank_text_and_non_positive_quantity() {
        let mut doc = PurchaseDocument::new();
        assert!(matches!(
            doc.add_line("", 3),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            doc.add_line("Bolt M6", -1),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn receive_guard_requires_pending_with_lines() {
        let mut doc = PurchaseDocument::new();
        assert!(matches!(
            doc.ensure_receivable(),
            Err(LedgerError::Validation(_))
        ));

        doc.add_line("Bolt M6", 3).unwrap();
        assert!(doc.ensure_receivable().is_ok());

        doc.transition_to(PurchaseStatus::Received).unwrap();
        assert!(matches!(
            doc.ensure_receivable(),
            Err(LedgerError::InvalidTransition(_))
        ));
    }

    #[test]
    fn receipt_has_no_reversal() {
        let mut doc = PurchaseDocument::new();
        doc.add_line("Bolt M6", 3).unwrap();
        doc.transition_to(PurchaseStatus::Received).unwrap();

        assert!(doc.transition_to(PurchaseStatus::Pending).is_err());
        assert!(doc.transition_to(PurchaseStatus::Cancelled).is_err());
    }

    #[test]
    fn cancelled_document_cannot_be_received() {
        let mut doc = PurchaseDocument::new();
        doc.add_line("Bolt M6", 3).unwrap();
        doc.transition_to(PurchaseStatus::Cancelled).unwrap();

        assert!(matches!(
            doc.ensure_receivable(),
            Err(LedgerError::InvalidTransition(_))
        ));
        assert!(doc.transition_to(PurchaseStatus::Received).is_err());
    }
}
