use serde::Serialize;

use super::normalize::{DMY, DMY_HM, DMY_HMS, DMY_SHORT, ORACLE_TS, RFC2822};

macro_rules! archive {
    ($file:literal) => { concat!("https://nsearchives.nseindia.com/content/RSS/", $file) };
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Announcements,
    AnnualReports,
    BoardMeetings,
    Brsr,
    CorporateActions,
    InsiderTrading,
    InvestorComplaints,
    OfferDocuments,
    RelatedPartyTransactions,
    Regulation29,
    Regulation31,
    ReasonForEncumbrance,
    SecretarialCompliance,
    ShareTransfers,
    ShareholdingPattern,
    StatementOfDeviation,
    UnitHoldingPattern,
    VotingResults,
    Circulars,
}

#[cfg(test)]
impl Category {
    pub fn spec(self) -> &'static CategorySpec {
        CATALOG
            .iter()
            .find(|s| s.category == self)
            .unwrap_or_else(|| unreachable!("every category has a catalog entry"))
    }
}

/// How the natural key is derived.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GuidRule {
    /// link, else `title-published`
    Link,
    /// link, else sha256(title + description), else `title-published`
    LinkOrContentHash,
    /// `title-<raw value of column>`; the feed reuses one link for many actions
    TitleAnd(&'static str),
}

#[derive(Copy, Clone, Debug)]
pub struct PublishedRule {
    pub formats: &'static [&'static str],
    pub required: bool,
}

#[derive(Copy, Clone, Debug)]
pub enum LinkLayout {
    Single(&'static str),
    /// whitespace-packed `pdf xml` pair
    Split { primary: &'static str, secondary: &'static str },
}

#[derive(Copy, Clone, Debug)]
pub enum Source {
    /// `LABEL : value` inside the description, ended by any delimiter
    Label { label: &'static str, delimiters: &'static [char] },
    /// normalized key of a `|`-separated `KEY : value` description
    Key(&'static str),
    /// the whole description
    Description,
    /// text after a marker in the title
    TitleAfter(&'static str),
}

#[derive(Copy, Clone, Debug)]
pub enum FieldKind {
    Text,
    Date(&'static [&'static str]),
    Timestamp(&'static [&'static str]),
    Decimal,
}

#[derive(Copy, Clone, Debug)]
pub struct FieldRule {
    pub column: &'static str,
    pub source: Source,
    pub kind: FieldKind,
    pub required: bool,
}

#[derive(Debug)]
pub struct CategorySpec {
    pub category: Category,
    pub name: &'static str,
    pub feed_url: &'static str,
    pub table: &'static str,
    pub guid: GuidRule,
    pub requires_link: bool,
    pub requires_description: bool,
    pub published: Option<PublishedRule>,
    pub links: LinkLayout,
    pub fields: &'static [FieldRule],
    pub summary_url_column: &'static str,
}

pub const PUBLISHED_COLUMN: &str = "published_at";
pub const SYMBOL_COLUMN: &str = "company_symbol";
pub const SUMMARY_COLUMN: &str = "summary";
pub const KEY_COLUMN: &str = "guid";

impl CategorySpec {
    /// Columns a parsed record carries, in insert order (after guid, title).
    pub fn value_columns(&self) -> Vec<&'static str> {
        let mut cols = match self.links {
            LinkLayout::Single(c) => vec![c],
            LinkLayout::Split { primary, secondary } => vec![primary, secondary],
        };
        cols.extend(self.fields.iter().map(|f| f.column));
        if self.published.is_some() { cols.push(PUBLISHED_COLUMN); }
        cols
    }

    /// Conditional insert: an existing guid makes this a no-op.
    pub fn insert_sql(&self) -> String {
        let mut cols = vec![KEY_COLUMN, "title"];
        cols.extend(self.value_columns());
        cols.push(SYMBOL_COLUMN);
        let params: Vec<String> = (1..=cols.len()).map(|i| format!("${i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO NOTHING",
            self.table,
            cols.join(", "),
            params.join(", "),
            KEY_COLUMN
        )
    }
}

pub fn all() -> &'static [CategorySpec] { CATALOG }

/// Catalog filtered to the requested categories (all when empty).
pub fn select(only: &[Category]) -> Vec<&'static CategorySpec> {
    CATALOG.iter().filter(|s| only.is_empty() || only.contains(&s.category)).collect()
}

const PIPE: &[char] = &['|'];
const COMMA: &[char] = &[','];

const fn label(column: &'static str, label: &'static str, kind: FieldKind, required: bool) -> FieldRule {
    FieldRule { column, source: Source::Label { label, delimiters: PIPE }, kind, required }
}

const fn key(column: &'static str, key: &'static str, kind: FieldKind, required: bool) -> FieldRule {
    FieldRule { column, source: Source::Key(key), kind, required }
}

const DESCRIPTION: FieldRule = FieldRule { column: "description", source: Source::Description, kind: FieldKind::Text, required: false };

const fn published(formats: &'static [&'static str]) -> Option<PublishedRule> {
    Some(PublishedRule { formats, required: true })
}

const LINK: LinkLayout = LinkLayout::Single("link");

static CATALOG: &[CategorySpec] = &[
    CategorySpec {
        category: Category::Announcements,
        name: "Announcements",
        feed_url: archive!("Online_announcements.xml"),
        table: "nse_announcements",
        guid: GuidRule::Link,
        requires_link: false,
        requires_description: false,
        published: published(&[RFC2822, DMY_HMS]),
        links: LINK,
        fields: &[DESCRIPTION],
        summary_url_column: "link",
    },
    CategorySpec {
        category: Category::AnnualReports,
        name: "Annual Reports",
        feed_url: archive!("Annual_Reports.xml"),
        table: "nse_annual_reports",
        guid: GuidRule::Link,
        requires_link: true,
        requires_description: false,
        published: None,
        links: LINK,
        fields: &[label("report_date", "AS ON DATE", FieldKind::Date(&[DMY_SHORT, DMY]), true)],
        summary_url_column: "link",
    },
    CategorySpec {
        category: Category::BoardMeetings,
        name: "Board Meetings",
        feed_url: archive!("Board_Meetings.xml"),
        table: "nse_board_meetings",
        guid: GuidRule::Link,
        requires_link: true,
        requires_description: false,
        published: published(&[DMY_HMS]),
        links: LINK,
        fields: &[label("meeting_date", "Meeting Date:", FieldKind::Date(&[DMY]), true)],
        summary_url_column: "link",
    },
    CategorySpec {
        category: Category::Brsr,
        name: "Business Responsibility and Sustainability Report",
        feed_url: archive!("brsr.xml"),
        table: "nse_brsr",
        guid: GuidRule::Link,
        requires_link: true,
        requires_description: false,
        published: None,
        links: LinkLayout::Split { primary: "pdf_link", secondary: "xml_link_name" },
        fields: &[label("submission_date", "ORIGINAL SUBMISSION DATE", FieldKind::Timestamp(&[ORACLE_TS]), true)],
        summary_url_column: "pdf_link",
    },
    CategorySpec {
        category: Category::CorporateActions,
        name: "Corporate Actions",
        feed_url: archive!("Corporate_action.xml"),
        table: "nse_corporate_actions",
        guid: GuidRule::TitleAnd("record_date"),
        requires_link: false,
        requires_description: true,
        published: published(&[DMY_HMS]),
        links: LINK,
        fields: &[
            DESCRIPTION,
            FieldRule { column: "ex_date", source: Source::TitleAfter("Ex-Date:"), kind: FieldKind::Date(&[DMY]), required: false },
            label("series", "SERIES", FieldKind::Text, false),
            label("purpose", "PURPOSE", FieldKind::Text, false),
            label("face_value", "FACE VALUE", FieldKind::Decimal, false),
            label("record_date", "RECORD DATE", FieldKind::Date(&[DMY]), true),
        ],
        summary_url_column: "link",
    },
    CategorySpec {
        category: Category::InsiderTrading,
        name: "Insider Trading",
        feed_url: archive!("Insider_Trading.xml"),
        table: "nse_insider_trading",
        guid: GuidRule::Link,
        requires_link: true,
        requires_description: false,
        published: published(&[DMY_HM, DMY_HMS]),
        links: LINK,
        fields: &[label("security_type", "TYPE OF SECURITY", FieldKind::Text, false)],
        summary_url_column: "link",
    },
    CategorySpec {
        category: Category::InvestorComplaints,
        name: "Investor Complaints",
        feed_url: archive!("Investor_Complaints.xml"),
        table: "nse_investor_complaints",
        guid: GuidRule::Link,
        requires_link: true,
        requires_description: false,
        published: published(&[DMY_HMS]),
        links: LINK,
        fields: &[label("quarter_ending_date", "FOR QUARTER ENDING", FieldKind::Date(&[DMY_SHORT, DMY]), true)],
        summary_url_column: "link",
    },
    CategorySpec {
        category: Category::OfferDocuments,
        name: "Offer Documents",
        feed_url: archive!("Offer_Documents.xml"),
        table: "nse_offer_documents",
        guid: GuidRule::Link,
        requires_link: true,
        requires_description: false,
        published: published(&[DMY, DMY_HMS]),
        links: LINK,
        fields: &[DESCRIPTION],
        summary_url_column: "link",
    },
    CategorySpec {
        category: Category::RelatedPartyTransactions,
        name: "Related Party Transactions",
        feed_url: archive!("Related_Party_Trans.xml"),
        table: "nse_related_party_transactions",
        guid: GuidRule::Link,
        requires_link: true,
        requires_description: false,
        published: published(&[DMY_HMS]),
        links: LINK,
        fields: &[label("period_end_date", "PERIOD END DATE", FieldKind::Date(&[DMY]), true)],
        summary_url_column: "link",
    },
    CategorySpec {
        category: Category::Regulation29,
        name: "SAST Regulation 29",
        feed_url: archive!("Sast_Regulation29.xml"),
        table: "nse_regulation29",
        guid: GuidRule::Link,
        requires_link: true,
        requires_description: false,
        published: published(&[DMY_HM, DMY_HMS]),
        links: LINK,
        fields: &[label("acquirer_name", "NAME(S)OF THE ACQUIRER AND ITS(PAC)", FieldKind::Text, false)],
        summary_url_column: "link",
    },
    CategorySpec {
        category: Category::Regulation31,
        name: "SAST Regulation 31",
        feed_url: archive!("Sast_Regulation31.xml"),
        table: "nse_regulation31",
        guid: GuidRule::Link,
        requires_link: true,
        requires_description: false,
        published: published(&[DMY_HMS]),
        links: LINK,
        fields: &[label("promoter_or_pacs_name", "NAME OF PROMOTER(S) OR PACS WITH HIM", FieldKind::Text, false)],
        summary_url_column: "link",
    },
    CategorySpec {
        category: Category::ReasonForEncumbrance,
        name: "Reason for Encumbrance",
        feed_url: archive!("Sast_ReasonForEncumbrance.xml"),
        table: "nse_reason_for_encumbrance",
        guid: GuidRule::LinkOrContentHash,
        requires_link: false,
        requires_description: true,
        // pubDate is frequently empty on this feed
        published: Some(PublishedRule { formats: &[RFC2822, DMY_HMS, DMY_HM], required: false }),
        links: LINK,
        fields: &[label(
            "promoter_name",
            "NAME OF THE PROMOTER(S) / PACS WHOSE SHARES HAVE BEEN ENCUMBERED",
            FieldKind::Text,
            false,
        )],
        summary_url_column: "link",
    },
    CategorySpec {
        category: Category::SecretarialCompliance,
        name: "Secretarial Compliance",
        feed_url: archive!("Secretarial_Compliance.xml"),
        table: "nse_secretarial_compliance",
        guid: GuidRule::Link,
        requires_link: true,
        requires_description: false,
        published: published(&[DMY_HM, DMY_HMS]),
        links: LinkLayout::Split { primary: "pdf_link", secondary: "xml_link" },
        fields: &[
            FieldRule {
                column: "financial_year",
                source: Source::Label { label: "FINANCIAL YEAR", delimiters: COMMA },
                kind: FieldKind::Text,
                required: false,
            },
            FieldRule {
                column: "submission_type",
                source: Source::Label { label: "SUBMISSION TYPE", delimiters: COMMA },
                kind: FieldKind::Text,
                required: false,
            },
        ],
        summary_url_column: "pdf_link",
    },
    CategorySpec {
        category: Category::ShareTransfers,
        name: "Share Transfers",
        feed_url: archive!("Share_Transfers.xml"),
        table: "nse_share_transfers",
        guid: GuidRule::LinkOrContentHash,
        requires_link: false,
        requires_description: true,
        published: published(&[DMY_HM, DMY_HMS]),
        links: LINK,
        fields: &[label("period_end_date", "PERIOD ENDED", FieldKind::Date(&[DMY]), true)],
        summary_url_column: "link",
    },
    CategorySpec {
        category: Category::ShareholdingPattern,
        name: "Shareholding Pattern",
        feed_url: archive!("Shareholding_Pattern.xml"),
        table: "nse_shareholding_pattern",
        guid: GuidRule::Link,
        requires_link: true,
        requires_description: true,
        published: published(&[DMY_HMS]),
        links: LINK,
        fields: &[
            key("as_on_date", "AS_ON_DATE", FieldKind::Date(&[DMY]), true),
            key("promoter_holding", "PR_AND_PRGRP", FieldKind::Decimal, false),
            key("public_holding", "PUBLIC_VAL", FieldKind::Decimal, false),
            key("employee_trust_holding", "EMPTR", FieldKind::Decimal, false),
            key("revised_status", "NDS_REVISED_STATUS", FieldKind::Text, false),
            key("submission_date", "SUBMISSION_DT", FieldKind::Date(&[DMY]), true),
            key("revision_date", "REVISION_DT", FieldKind::Date(&[DMY]), false),
        ],
        summary_url_column: "link",
    },
    CategorySpec {
        category: Category::StatementOfDeviation,
        name: "Statement of Deviation",
        feed_url: archive!("Statement_Of_Deviation.xml"),
        table: "nse_statement_of_deviation",
        guid: GuidRule::Link,
        requires_link: true,
        requires_description: false,
        published: published(&[DMY_HMS]),
        links: LINK,
        fields: &[label("period_end_date", "PERIOD END DATE", FieldKind::Date(&[DMY]), true)],
        summary_url_column: "link",
    },
    CategorySpec {
        category: Category::UnitHoldingPattern,
        name: "Unit Holding Pattern",
        feed_url: archive!("Unitholding_Patterns.xml"),
        table: "nse_unit_holding_pattern",
        guid: GuidRule::Link,
        requires_link: true,
        requires_description: false,
        published: published(&[DMY_HMS]),
        links: LINK,
        fields: &[label("as_on_date", "AS ON DATE", FieldKind::Date(&[DMY]), true)],
        summary_url_column: "link",
    },
    CategorySpec {
        category: Category::VotingResults,
        name: "Voting Results",
        feed_url: archive!("Voting_Results.xml"),
        table: "nse_voting_results",
        guid: GuidRule::Link,
        requires_link: true,
        requires_description: false,
        published: published(&[DMY_HMS]),
        links: LINK,
        fields: &[label("meeting_date", "MEETING DATE", FieldKind::Date(&[DMY]), true)],
        summary_url_column: "link",
    },
    CategorySpec {
        category: Category::Circulars,
        name: "Circulars",
        feed_url: archive!("Circulars.xml"),
        table: "nse_circulars",
        guid: GuidRule::Link,
        requires_link: true,
        requires_description: false,
        published: published(&[RFC2822, DMY_HMS]),
        links: LINK,
        fields: &[],
        summary_url_column: "link",
    },
];
