//! # Target Session Protocol
//!
//! Frames exchanged with the Target system's session endpoint.
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Target Session Protocol                             │
//! │                                                                         │
//! │  SESSION                                                               │
//! │  ───────                                                               │
//! │  CONNECTOR ───► OpenSession { company, username, password }            │
//! │  TARGET    ◄─── SessionOpened { sessionId }                            │
//! │                                                                         │
//! │  EXPORT (one call per sales invoice)                                   │
//! │  ───────────────────────────────────                                   │
//! │  CONNECTOR ───► CreateSalesDocument { DO_Type: "FV", Lignes: [...] }   │
//! │  TARGET    ◄─── DocumentCommitted { documentNumber }                   │
//! │                                                                         │
//! │  IMPORT (range queries)                                                │
//! │  ──────────────────────                                                │
//! │  CONNECTOR ───► ListDocuments { documentType: "FA", from, to }         │
//! │  TARGET    ◄─── Documents { items: [...] }                             │
//! │  CONNECTOR ───► ListLedgerEntries { from, to }                         │
//! │  TARGET    ◄─── LedgerEntries { items: [...] }                         │
//! │                                                                         │
//! │  ERROR (in place of any reply)                                         │
//! │  ─────                                                                 │
//! │  TARGET    ◄─── Fault { code, message }                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Every frame carries a sequence number; a reply echoes the number of the
//! request it answers:
//! ```json
//! { "seq": 3, "message": { "type": "ListDocuments", "payload": { ... } } }
//! ```
//!
//! Document and ledger fields keep the Target's own column names
//! (`DO_Piece`, `EC_Montant`, ...). Amounts and rates are accepted as JSON
//! numbers or as decimal strings with `.` or `,`.
//!
//! List replies are decoded item by item ([`RemoteDocument::from_item`],
//! [`LedgerEntry::from_item`]); an item that does not decode is rejected on
//! its own with its natural key.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use syncbridge_core::{
    CoreError, Money, PaymentKind, PurchaseAmounts, TargetPayment, TargetPurchaseInvoice,
    TargetPurchaseInvoiceLine, TargetSalesInvoice, TaxRate,
};

/// Document type code of a sales invoice on the Target side.
pub const SALES_INVOICE_TYPE: &str = "FV";

/// Document type code of a purchase invoice on the Target side.
pub const PURCHASE_INVOICE_TYPE: &str = "FA";

// =============================================================================
// Frame
// =============================================================================

/// One protocol frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub seq: u64,
    pub message: RemoteMessage,
}

impl Frame {
    pub fn new(seq: u64, message: RemoteMessage) -> Self {
        Frame { seq, message }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// =============================================================================
// Main Message Enum (Tagged Union)
// =============================================================================

/// All session protocol messages.
///
/// `{ "type": "SessionOpened", "payload": { ... } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum RemoteMessage {
    // =========================================================================
    // Requests (connector → Target)
    // =========================================================================
    OpenSession(OpenSessionPayload),

    CreateSalesDocument(SalesDocument),

    ListDocuments(ListDocumentsPayload),

    ListLedgerEntries(DateRangePayload),

    CloseSession,

    // =========================================================================
    // Replies (Target → connector)
    // =========================================================================
    SessionOpened(SessionOpenedPayload),

    DocumentCommitted(DocumentCommittedPayload),

    /// Items stay undecoded so one malformed document cannot fail the reply.
    Documents { items: Vec<Value> },

    LedgerEntries { items: Vec<Value> },

    SessionClosed,

    /// The Target refused or failed the request.
    Fault { code: String, message: String },
}

impl RemoteMessage {
    /// Returns the message type name for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            RemoteMessage::OpenSession(_) => "OpenSession",
            RemoteMessage::CreateSalesDocument(_) => "CreateSalesDocument",
            RemoteMessage::ListDocuments(_) => "ListDocuments",
            RemoteMessage::ListLedgerEntries(_) => "ListLedgerEntries",
            RemoteMessage::CloseSession => "CloseSession",
            RemoteMessage::SessionOpened(_) => "SessionOpened",
            RemoteMessage::DocumentCommitted(_) => "DocumentCommitted",
            RemoteMessage::Documents { .. } => "Documents",
            RemoteMessage::LedgerEntries { .. } => "LedgerEntries",
            RemoteMessage::SessionClosed => "SessionClosed",
            RemoteMessage::Fault { .. } => "Fault",
        }
    }
}

// =============================================================================
// Session Payloads
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionPayload {
    pub company: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for OpenSessionPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenSessionPayload")
            .field("company", &self.company)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOpenedPayload {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCommittedPayload {
    /// Number the Target assigned to the new document, if it reports one.
    #[serde(default)]
    pub document_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsPayload {
    pub document_type: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRangePayload {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

// =============================================================================
// Sales Document (export payload)
// =============================================================================

/// A sales invoice as the Target expects to receive it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesDocument {
    #[serde(rename = "DO_Type")]
    pub document_type: String,
    #[serde(rename = "CT_Num")]
    pub party_code: String,
    #[serde(rename = "DO_Date")]
    pub date: NaiveDate,
    #[serde(rename = "DO_DateEch", default)]
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "DO_Objet")]
    pub subject: String,
    #[serde(rename = "DO_Ref")]
    pub internal_ref: String,
    #[serde(rename = "Lignes")]
    pub lines: Vec<SalesDocumentLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesDocumentLine {
    #[serde(rename = "DL_Ligne")]
    pub line_no: i64,
    #[serde(rename = "AR_Ref")]
    pub article_code: String,
    #[serde(rename = "DL_Design")]
    pub description: String,
    #[serde(rename = "DL_Qte")]
    pub quantity: f64,
    #[serde(rename = "DL_PrixUnitaire", with = "amount")]
    pub unit_price: Money,
    #[serde(rename = "DL_Taxe1", with = "rate")]
    pub tax_rate: TaxRate,
    #[serde(rename = "DL_TypeLigne")]
    pub line_type: String,
}

impl From<&TargetSalesInvoice> for SalesDocument {
    fn from(invoice: &TargetSalesInvoice) -> Self {
        SalesDocument {
            document_type: SALES_INVOICE_TYPE.to_string(),
            party_code: invoice.party_code.clone(),
            date: invoice.issue_date,
            due_date: invoice.due_date,
            subject: invoice.subject.clone(),
            internal_ref: invoice.internal_ref.clone(),
            lines: invoice
                .lines
                .iter()
                .map(|line| SalesDocumentLine {
                    line_no: line.line_no,
                    article_code: line.article_code.clone(),
                    description: line.description.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    tax_rate: line.tax_rate,
                    line_type: line.line_type.clone(),
                })
                .collect(),
        }
    }
}

// =============================================================================
// Remote Document (purchase invoice import)
// =============================================================================

/// A purchase document returned by `ListDocuments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    #[serde(rename = "DO_Piece")]
    pub number: String,
    #[serde(rename = "DO_RefFourn", default)]
    pub supplier_ref: Option<String>,
    #[serde(rename = "CT_Num")]
    pub supplier_code: String,
    #[serde(rename = "CT_Intitule", default)]
    pub supplier_name: Option<String>,
    #[serde(rename = "DO_Date", with = "date")]
    pub date: NaiveDate,
    #[serde(rename = "DO_DateEch", with = "opt_date", default)]
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "DO_Libelle", default)]
    pub label: Option<String>,
    #[serde(rename = "DO_TotalHT", with = "amount")]
    pub total_ht: Money,
    #[serde(rename = "DO_TotalTVA", with = "amount")]
    pub total_tva: Money,
    #[serde(rename = "DO_TotalTTC", with = "amount")]
    pub total_ttc: Money,
    #[serde(rename = "DO_Devise", default)]
    pub currency: Option<String>,
    #[serde(rename = "DO_Statut", default)]
    pub status: Option<String>,
    #[serde(rename = "DO_Ref", default)]
    pub internal_ref: Option<String>,
    #[serde(rename = "Lignes", default)]
    pub lines: Vec<RemoteDocumentLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocumentLine {
    #[serde(rename = "DL_Ligne")]
    pub line_no: i64,
    #[serde(rename = "DL_TypeLigne", default)]
    pub line_type: Option<String>,
    #[serde(rename = "AR_Ref", default)]
    pub article_code: Option<String>,
    #[serde(rename = "DL_Design", default)]
    pub designation: Option<String>,
    #[serde(rename = "DL_Qte")]
    pub quantity: f64,
    #[serde(rename = "DL_PrixUnitaire", with = "amount")]
    pub unit_price_ht: Money,
    #[serde(rename = "DL_MontantHT", with = "amount")]
    pub amount_ht: Money,
    #[serde(rename = "DL_Taxe1", with = "rate")]
    pub tax_rate: TaxRate,
    #[serde(rename = "DL_MontantTVA", with = "amount")]
    pub amount_tva: Money,
    #[serde(rename = "DL_MontantTTC", with = "amount")]
    pub amount_ttc: Money,
    #[serde(rename = "CG_Num", default)]
    pub account_code: Option<String>,
    #[serde(rename = "CA_Num", default)]
    pub cost_center: Option<String>,
}

impl From<RemoteDocument> for TargetPurchaseInvoice {
    fn from(doc: RemoteDocument) -> Self {
        TargetPurchaseInvoice {
            invoice_number: doc.number,
            supplier_ref: doc.supplier_ref,
            supplier_code: doc.supplier_code,
            supplier_name: doc.supplier_name,
            issue_date: doc.date,
            due_date: doc.due_date,
            label: doc.label,
            amounts: PurchaseAmounts {
                ht: doc.total_ht,
                tva: doc.total_tva,
                ttc: doc.total_ttc,
            },
            currency: doc.currency,
            status: doc.status,
            internal_ref: doc.internal_ref,
            lines: doc.lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<RemoteDocumentLine> for TargetPurchaseInvoiceLine {
    fn from(line: RemoteDocumentLine) -> Self {
        TargetPurchaseInvoiceLine {
            line_no: line.line_no,
            line_type: line.line_type,
            article_code: line.article_code,
            designation: line.designation,
            quantity: line.quantity,
            unit_price_ht: line.unit_price_ht,
            amount_ht: line.amount_ht,
            tax_rate: line.tax_rate,
            amount_tva: line.amount_tva,
            amount_ttc: line.amount_ttc,
            account_code: line.account_code,
            cost_center: line.cost_center,
        }
    }
}

// =============================================================================
// Ledger Entry (payment import)
// =============================================================================

/// A settlement entry returned by `ListLedgerEntries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "RG_No")]
    pub number: String,
    #[serde(rename = "EC_RefPiece", default)]
    pub invoice_number: Option<String>,
    #[serde(rename = "CT_Num")]
    pub party_code: String,
    #[serde(rename = "CT_Intitule", default)]
    pub party_name: Option<String>,
    #[serde(rename = "EC_Date", with = "date")]
    pub date: NaiveDate,
    #[serde(rename = "EC_Montant", with = "amount")]
    pub amount: Money,
    #[serde(rename = "RG_Mode", default)]
    pub method: Option<String>,
    #[serde(rename = "EC_Reference", default)]
    pub reference: Option<String>,
    #[serde(rename = "CG_Num", default)]
    pub account_code: Option<String>,
    #[serde(rename = "JO_Num", default)]
    pub journal: Option<String>,
    #[serde(rename = "EC_No", default)]
    pub entry_number: Option<String>,
    /// `"Client"` or `"Fournisseur"`.
    #[serde(rename = "RG_Type")]
    pub kind: String,
    #[serde(rename = "EC_Statut", default)]
    pub status: Option<String>,
}

impl TryFrom<LedgerEntry> for TargetPayment {
    type Error = CoreError;

    fn try_from(entry: LedgerEntry) -> Result<Self, Self::Error> {
        let kind: PaymentKind = entry.kind.parse()?;
        Ok(TargetPayment {
            payment_number: entry.number,
            invoice_number: entry.invoice_number,
            party_code: entry.party_code,
            party_name: entry.party_name,
            payment_date: entry.date,
            amount: entry.amount,
            method: entry.method,
            reference: entry.reference,
            account_code: entry.account_code,
            journal: entry.journal,
            entry_number: entry.entry_number,
            kind,
            status: entry.status,
        })
    }
}

// =============================================================================
// List Items
// =============================================================================

/// A list item that could not be decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedItem {
    /// Natural key (`DO_Piece`, `RG_No`) when the item carries a readable one.
    pub key: Option<String>,
    pub reason: String,
}

impl fmt::Display for RejectedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}: {}", key, self.reason),
            None => write!(f, "<no key>: {}", self.reason),
        }
    }
}

impl RemoteDocument {
    pub const KEY_FIELD: &'static str = "DO_Piece";

    pub fn from_item(item: Value) -> Result<Self, RejectedItem> {
        decode_item(item, Self::KEY_FIELD)
    }
}

impl LedgerEntry {
    pub const KEY_FIELD: &'static str = "RG_No";

    pub fn from_item(item: Value) -> Result<Self, RejectedItem> {
        decode_item(item, Self::KEY_FIELD)
    }
}

fn decode_item<T: DeserializeOwned>(item: Value, key_field: &str) -> Result<T, RejectedItem> {
    let key = match item.get(key_field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    serde_json::from_value(item).map_err(|e| RejectedItem {
        key,
        reason: e.to_string(),
    })
}

// =============================================================================
// Field Codecs
// =============================================================================

/// Accepts a JSON number or a decimal string.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn into_text(self) -> String {
        match self {
            NumberOrText::Number(n) => n.to_string(),
            NumberOrText::Text(s) => s,
        }
    }
}

/// Amounts travel as decimal strings (`"1250.40"`).
mod amount {
    use super::NumberOrText;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use syncbridge_core::Money;

    pub fn serialize<S: Serializer>(value: &Money, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        let text = NumberOrText::deserialize(deserializer)?.into_text();
        Money::parse(&text).map_err(D::Error::custom)
    }
}

/// Tax rates travel as percentages (`20`, `5.5`).
mod rate {
    use super::NumberOrText;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use syncbridge_core::TaxRate;

    pub fn serialize<S: Serializer>(value: &TaxRate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.percentage())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TaxRate, D::Error> {
        let text = NumberOrText::deserialize(deserializer)?.into_text();
        TaxRate::parse(&text).map_err(D::Error::custom)
    }
}

/// Dates may carry a time part (`2024-01-15T00:00:00`); only the day is kept.
mod date {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn parse(text: &str) -> Result<NaiveDate, chrono::ParseError> {
        let day = text.get(..10).unwrap_or(text);
        NaiveDate::parse_from_str(day, "%Y-%m-%d")
    }

    pub fn serialize<S: Serializer>(value: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(D::Error::custom)
    }
}

mod opt_date {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => super::date::serialize(d, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) if !text.trim().is_empty() => {
                super::date::parse(&text).map(Some).map_err(D::Error::custom)
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_wire_shape() {
        let frame = Frame::new(
            3,
            RemoteMessage::ListDocuments(ListDocumentsPayload {
                document_type: PURCHASE_INVOICE_TYPE.into(),
                from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                to: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            }),
        );
        let json = frame.to_json().unwrap();
        assert!(json.contains("\"seq\":3"));
        assert!(json.contains("\"type\":\"ListDocuments\""));
        assert!(json.contains("\"documentType\":\"FA\""));
        assert!(json.contains("\"from\":\"2024-01-01\""));

        let close = Frame::new(4, RemoteMessage::CloseSession).to_json().unwrap();
        let parsed = Frame::from_json(&close).unwrap();
        assert_eq!(parsed.message.type_name(), "CloseSession");
    }

    #[test]
    fn test_document_accepts_number_and_text_amounts() {
        let json = r#"{
            "DO_Piece": "FA-1001",
            "CT_Num": "F0042",
            "DO_Date": "2024-01-15T00:00:00",
            "DO_DateEch": "",
            "DO_TotalHT": 100,
            "DO_TotalTVA": "20,00",
            "DO_TotalTTC": "120.00",
            "Lignes": [{
                "DL_Ligne": 1,
                "DL_Qte": 2,
                "DL_PrixUnitaire": "50",
                "DL_MontantHT": 100.0,
                "DL_Taxe1": "5,5",
                "DL_MontantTVA": 5.5,
                "DL_MontantTTC": "105.50"
            }]
        }"#;

        let doc: RemoteDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(doc.due_date, None);
        assert_eq!(doc.total_ht, Money::from_cents(10_000));
        assert_eq!(doc.total_tva, Money::from_cents(2_000));
        assert_eq!(doc.lines[0].tax_rate, TaxRate::from_bps(550));
        assert_eq!(doc.lines[0].amount_tva, Money::from_cents(550));

        let invoice = TargetPurchaseInvoice::from(doc);
        assert_eq!(invoice.invoice_number, "FA-1001");
        assert_eq!(invoice.amounts.ttc, Money::from_cents(12_000));
        assert_eq!(invoice.lines.len(), 1);
    }

    #[test]
    fn test_malformed_item_does_not_fail_the_reply() {
        let json = r#"{"seq":5,"message":{"type":"Documents","payload":{"items":[
            {"DO_Piece":"FA-1","CT_Num":"F0042","DO_Date":"2024-01-15",
             "DO_TotalHT":"100","DO_TotalTVA":"20","DO_TotalTTC":"120"},
            {"DO_Piece":"FA-2","CT_Num":"F0042","DO_Date":"2024-01-16",
             "DO_TotalHT":"N/A","DO_TotalTVA":"20","DO_TotalTTC":"120"},
            {"CT_Num":"F0042"}
        ]}}}"#;

        let frame = Frame::from_json(json).unwrap();
        let RemoteMessage::Documents { items } = frame.message else {
            panic!("expected Documents");
        };

        let decoded: Vec<_> = items.into_iter().map(RemoteDocument::from_item).collect();
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0].as_ref().unwrap().number, "FA-1");

        let bad = decoded[1].as_ref().unwrap_err();
        assert_eq!(bad.key.as_deref(), Some("FA-2"));
        assert!(bad.reason.contains("N/A"));

        let keyless = decoded[2].as_ref().unwrap_err();
        assert_eq!(keyless.key, None);
        assert!(keyless.to_string().starts_with("<no key>"));
    }

    #[test]
    fn test_ledger_entry_kind() {
        let json = r#"{
            "RG_No": "RG-7",
            "CT_Num": "C0001",
            "EC_Date": "2024-02-03",
            "EC_Montant": "-45,10",
            "RG_Type": "Fournisseur"
        }"#;
        let entry: LedgerEntry = serde_json::from_str(json).unwrap();
        let payment = TargetPayment::try_from(entry.clone()).unwrap();
        assert_eq!(payment.kind, PaymentKind::Supplier);
        assert_eq!(payment.amount, Money::from_cents(-4_510));

        let unknown = LedgerEntry {
            kind: "Banque".into(),
            ..entry
        };
        assert!(TargetPayment::try_from(unknown).is_err());
    }

    #[test]
    fn test_sales_document_field_names() {
        let doc = SalesDocument {
            document_type: SALES_INVOICE_TYPE.into(),
            party_code: "C0001".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            due_date: None,
            subject: "Order 1".into(),
            internal_ref: "FV-2024-00001".into(),
            lines: vec![SalesDocumentLine {
                line_no: 1,
                article_code: "LIC-STD".into(),
                description: "Standard license".into(),
                quantity: 1.0,
                unit_price: Money::from_cents(12_050),
                tax_rate: TaxRate::from_bps(2000),
                line_type: "Product".into(),
            }],
        };
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"DO_Type\":\"FV\""));
        assert!(json.contains("\"DL_PrixUnitaire\":\"120.50\""));
        assert!(json.contains("\"DL_Taxe1\":20.0"));
    }

    #[test]
    fn test_open_session_debug_redacts_password() {
        let payload = OpenSessionPayload {
            company: "ACME".into(),
            username: "sync".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{:?}", payload).contains("hunter2"));
    }
}
