//! Organization record.

use crate::model::common::{EntityRef, Metadata, Social, Tag, User};
use crate::model::{BatchQuery, DomainName, Record};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// GraphQL selection for one organization.
pub const ORGANIZATION_SELECTION: &str = "
    metadata { id created lastUpdated source }
    name
    website
    relationship
    stage
    hide
    owner { id firstName lastName name }
    accountDetails {
        churned
        ltv
        renewalSummary { arrForecast maxArrForecast renewalLikelihood nextRenewalDate }
    }
    lastTouchpoint { lastTouchPointAt lastTouchPointType }
    tags { id name }
    socialMedia { id url followersCount }
    contracts { metadata { id } }
";

static ORGANIZATIONS_BY_IDS: Lazy<String> = Lazy::new(|| {
    format!(
        "query getOrganizationsByIds($ids: [ID!]!) {{ organizations_ByIds(ids: $ids) {{ {ORGANIZATION_SELECTION} }} }}"
    )
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationRelationship {
    Customer,
    Prospect,
    NotAFit,
    FormerCustomer,
    #[serde(other)]
    Unknown,
}

impl OrganizationRelationship {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::Prospect => "PROSPECT",
            Self::NotAFit => "NOT_A_FIT",
            Self::FormerCustomer => "FORMER_CUSTOMER",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationStage {
    Lead,
    Target,
    Engaged,
    Trial,
    ReadyToBuy,
    Onboarding,
    InitialValue,
    RecurringValue,
    MaxValue,
    PendingChurn,
    #[serde(other)]
    Unknown,
}

impl OrganizationStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lead => "LEAD",
            Self::Target => "TARGET",
            Self::Engaged => "ENGAGED",
            Self::Trial => "TRIAL",
            Self::ReadyToBuy => "READY_TO_BUY",
            Self::Onboarding => "ONBOARDING",
            Self::InitialValue => "INITIAL_VALUE",
            Self::RecurringValue => "RECURRING_VALUE",
            Self::MaxValue => "MAX_VALUE",
            Self::PendingChurn => "PENDING_CHURN",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenewalLikelihood {
    High,
    Medium,
    Low,
    Zero,
    #[serde(other)]
    Unknown,
}

impl RenewalLikelihood {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Zero => "ZERO",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Sort rank, higher likelihood first.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
            Self::Zero => 3,
            Self::Unknown => 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenewalSummary {
    pub arr_forecast: Option<f64>,
    pub max_arr_forecast: Option<f64>,
    pub renewal_likelihood: Option<RenewalLikelihood>,
    /// ISO timestamp; only the date portion is meaningful.
    pub next_renewal_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountDetails {
    pub churned: Option<String>,
    pub ltv: Option<f64>,
    pub renewal_summary: Option<RenewalSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LastTouchpoint {
    pub last_touch_point_at: Option<String>,
    pub last_touch_point_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Organization {
    pub metadata: Metadata,
    pub name: String,
    pub website: Option<String>,
    pub relationship: Option<OrganizationRelationship>,
    pub stage: Option<OrganizationStage>,
    pub hide: bool,
    pub owner: Option<User>,
    pub account_details: Option<AccountDetails>,
    pub last_touchpoint: Option<LastTouchpoint>,
    pub tags: Vec<Tag>,
    pub social_media: Vec<Social>,
    /// Contracts of this organization, resolved through the contracts collection.
    pub contracts: Vec<EntityRef>,
}

impl Organization {
    pub fn renewal_summary(&self) -> Option<&RenewalSummary> {
        self.account_details
            .as_ref()
            .and_then(|details| details.renewal_summary.as_ref())
    }

    pub fn renewal_likelihood(&self) -> Option<RenewalLikelihood> {
        self.renewal_summary()
            .and_then(|summary| summary.renewal_likelihood)
    }

    pub fn arr_forecast(&self) -> Option<f64> {
        self.renewal_summary().and_then(|summary| summary.arr_forecast)
    }

    pub fn next_renewal_date(&self) -> Option<&str> {
        self.renewal_summary()
            .and_then(|summary| summary.next_renewal_date.as_deref())
    }
}

impl Record for Organization {
    const DOMAIN: DomainName = DomainName::Organizations;

    fn batch_query() -> BatchQuery {
        BatchQuery {
            document: ORGANIZATIONS_BY_IDS.as_str(),
            field: "organizations_ByIds",
        }
    }

    fn id(&self) -> &str {
        &self.metadata.id
    }

    fn set_id(&mut self, id: &str) {
        self.metadata.id = id.to_string();
    }
}
