//! Domain models for SubHub

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category assigned when none is supplied
pub const DEFAULT_CATEGORY: &str = "Other";

/// A user who owns subscriptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    /// Contact address used for reminders
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Subscription billing cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    #[serde(alias = "Monthly")]
    Monthly,
    #[serde(alias = "Quarterly")]
    Quarterly,
    #[serde(alias = "Yearly")]
    Yearly,
    /// No recurring charge
    #[serde(alias = "Free")]
    Free,
}

impl BillingCycle {
    /// Paid cycles, shortest first
    pub const PAID: [BillingCycle; 3] = [Self::Monthly, Self::Quarterly, Self::Yearly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
            Self::Free => "free",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Monthly => "Monthly",
            Self::Quarterly => "Quarterly",
            Self::Yearly => "Yearly",
            Self::Free => "Free",
        }
    }

    /// Cycle length in months (None for Free)
    pub fn months(&self) -> Option<u32> {
        match self {
            Self::Monthly => Some(1),
            Self::Quarterly => Some(3),
            Self::Yearly => Some(12),
            Self::Free => None,
        }
    }
}

impl std::str::FromStr for BillingCycle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "month" => Ok(Self::Monthly),
            "quarterly" | "quarter" => Ok(Self::Quarterly),
            "yearly" | "annual" | "annually" | "year" => Ok(Self::Yearly),
            "free" => Ok(Self::Free),
            _ => Err(format!(
                "Unknown billing cycle: {} (valid: monthly, quarterly, yearly, free)",
                s
            )),
        }
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Subscription lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[serde(alias = "Active")]
    Active,
    /// Past due and not renewed
    #[serde(alias = "Inactive")]
    Inactive,
    /// Explicitly cancelled by the user; never changed by date inference
    #[serde(alias = "Cancelled")]
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(format!(
                "Unknown status: {} (valid: active, inactive, cancelled)",
                s
            )),
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Optional descriptive fields carried with a subscription
///
/// None of these are interpreted by status, reminder or analytics logic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SubscriptionMetadata {
    /// Overlay fields that are set in `other`
    pub fn merge(&mut self, other: SubscriptionMetadata) {
        if other.description.is_some() {
            self.description = other.description;
        }
        if other.logo_url.is_some() {
            self.logo_url = other.logo_url;
        }
        if other.payment_url.is_some() {
            self.payment_url = other.payment_url;
        }
        if other.manage_url.is_some() {
            self.manage_url = other.manage_url;
        }
        if other.account_url.is_some() {
            self.account_url = other.account_url;
        }
        if other.notes.is_some() {
            self.notes = other.notes;
        }
    }
}

/// A tracked recurring payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    pub name: String,
    pub cost: f64,
    pub billing_cycle: BillingCycle,
    pub next_due_date: Option<DateTime<Utc>>,
    pub category: String,
    /// Stored status (may be stale, see `status::resolve_status`)
    pub status: SubscriptionStatus,
    /// Dedup marker written by the reminder dispatcher
    pub last_reminder_sent: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub metadata: SubscriptionMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Apply a partial update in place, then re-validate
    pub fn apply_update(&mut self, update: SubscriptionUpdate) -> crate::Result<()> {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(cost) = update.cost {
            self.cost = cost;
        }
        if let Some(cycle) = update.billing_cycle {
            self.billing_cycle = cycle;
        }
        if update.clear_next_due_date {
            self.next_due_date = None;
        } else if let Some(due) = update.next_due_date {
            self.next_due_date = Some(due);
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.metadata.merge(update.metadata);

        if self.billing_cycle == BillingCycle::Free {
            self.cost = 0.0;
        }
        validate_fields(&self.name, self.cost, &self.category)
    }
}

/// Input for creating a subscription
#[derive(Debug, Clone, Default)]
pub struct NewSubscription {
    pub name: String,
    pub cost: f64,
    pub billing_cycle: Option<BillingCycle>,
    pub next_due_date: Option<DateTime<Utc>>,
    pub category: Option<String>,
    /// Explicit initial status; Active when absent
    pub status: Option<SubscriptionStatus>,
    pub metadata: SubscriptionMetadata,
}

impl NewSubscription {
    /// Check required fields before anything is written
    pub fn validate(&self) -> crate::Result<()> {
        validate_fields(
            &self.name,
            self.cost,
            self.category.as_deref().unwrap_or(DEFAULT_CATEGORY),
        )
    }

    /// Billing cycle with the Monthly default applied
    pub fn cycle(&self) -> BillingCycle {
        self.billing_cycle.unwrap_or(BillingCycle::Monthly)
    }

    /// Cost with the Free rule applied (Free subscriptions carry no cost)
    pub fn effective_cost(&self) -> f64 {
        if self.cycle() == BillingCycle::Free {
            0.0
        } else {
            self.cost
        }
    }

    pub fn category(&self) -> &str {
        match self.category.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => DEFAULT_CATEGORY,
        }
    }
}

fn validate_fields(name: &str, cost: f64, category: &str) -> crate::Result<()> {
    if name.trim().is_empty() {
        return Err(crate::Error::InvalidData(
            "Subscription must have a name".to_string(),
        ));
    }
    if !cost.is_finite() {
        return Err(crate::Error::InvalidData(
            "Subscription must have a cost".to_string(),
        ));
    }
    if cost < 0.0 {
        return Err(crate::Error::InvalidData(
            "Cost cannot be negative".to_string(),
        ));
    }
    if category.trim().is_empty() {
        return Err(crate::Error::InvalidData(
            "Category cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Partial update of a subscription (unset fields are left alone)
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdate {
    pub name: Option<String>,
    pub cost: Option<f64>,
    pub billing_cycle: Option<BillingCycle>,
    pub next_due_date: Option<DateTime<Utc>>,
    /// Remove the due date entirely
    pub clear_next_due_date: bool,
    pub category: Option<String>,
    pub status: Option<SubscriptionStatus>,
    pub metadata: SubscriptionMetadata,
}

/// Moving a Free subscription onto a paid plan
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpgrade {
    /// Target cycle; Monthly when absent
    pub billing_cycle: Option<BillingCycle>,
    /// New per-cycle cost; 0 when absent
    pub cost: Option<f64>,
    pub next_due_date: Option<DateTime<Utc>>,
}

/// A subscription annotated with its effective status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSubscription {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub effective_status: SubscriptionStatus,
}

/// A reminder candidate with the owner's contact info joined in
#[derive(Debug, Clone)]
pub struct ReminderCandidate {
    pub subscription: Subscription,
    /// None when the owning user row is gone
    pub owner: Option<User>,
}

/// Outcome of one reminder dispatch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRunResult {
    /// Candidates examined
    pub checked: usize,
    /// Reminders handed off and recorded
    pub sent: usize,
}

/// Outcome of a status reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileResult {
    pub checked: usize,
    pub updated: usize,
}

/// An audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub user_email: String,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub details: Option<String>,
}

/// Parse a due date from user input
///
/// Accepts `YYYY-MM-DD` (midnight UTC), RFC 3339, or the stored
/// `YYYY-MM-DD HH:MM:SS` form. Returns None for anything else.
pub fn parse_due_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

// ========== Report Models ==========

/// Lookback window for the analytics report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReportPeriod {
    #[serde(rename = "3months")]
    ThreeMonths,
    #[default]
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "12months")]
    TwelveMonths,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThreeMonths => "3months",
            Self::SixMonths => "6months",
            Self::TwelveMonths => "12months",
        }
    }

    pub fn months(&self) -> u32 {
        match self {
            Self::ThreeMonths => 3,
            Self::SixMonths => 6,
            Self::TwelveMonths => 12,
        }
    }
}

impl std::str::FromStr for ReportPeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "3months" | "3m" => Ok(Self::ThreeMonths),
            "6months" | "6m" => Ok(Self::SixMonths),
            "12months" | "12m" | "1year" => Ok(Self::TwelveMonths),
            _ => Err(format!(
                "Unknown period: {} (valid: 3months, 6months, 12months)",
                s
            )),
        }
    }
}

/// Spend per category within the reporting window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub category: String,
    pub total_spent: f64,
    pub count: usize,
}

/// Spend per calendar month ("YYYY-MM")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrendPoint {
    pub month: String,
    pub total_spent: f64,
}

/// Spend per subscription name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopSubscription {
    pub name: String,
    pub total_spent: f64,
    pub occurrences: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_spent: f64,
    pub active_categories: usize,
    /// Highest-spending subscription name, or "N/A"
    pub top_subscription: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsCharts {
    pub category_breakdown: Vec<CategoryBreakdown>,
    pub monthly_trend: Vec<MonthlyTrendPoint>,
    pub top_subscriptions: Vec<TopSubscription>,
}

/// Period analytics report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub period: ReportPeriod,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub summary: AnalyticsSummary,
    pub charts: AnalyticsCharts,
}

/// Normalized cost of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCost {
    pub category: String,
    pub cost: f64,
}

/// Number of subscriptions on a billing cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleCount {
    pub billing_cycle: BillingCycle,
    pub count: usize,
}

/// A payment coming up soon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingPayment {
    pub id: i64,
    pub name: String,
    pub cost: f64,
    pub billing_cycle: BillingCycle,
    pub next_due_date: DateTime<Utc>,
}

/// Potential savings estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsEstimate {
    /// Monthly-equivalent cost of subscriptions that lapsed (per month)
    pub inactive: f64,
    /// Modeled discount from moving monthly/quarterly plans to yearly (per year)
    pub switch_to_yearly: f64,
    pub total: f64,
}

/// Cadence-normalized spending view for dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingView {
    /// Cadence every cost is expressed in
    pub view: BillingCycle,
    pub active_count: usize,
    /// Total in the chosen cadence
    pub total: f64,
    pub monthly_total: f64,
    pub annual_total: f64,
    pub categories: Vec<CategoryCost>,
    pub billing_cycles: Vec<CycleCount>,
    pub upcoming: Vec<UpcomingPayment>,
    pub savings: SavingsEstimate,
}
