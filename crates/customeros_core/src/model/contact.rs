//! Contact record.

use crate::model::common::{EntityRef, Social, Tag, User};
use crate::model::{BatchQuery, DomainName, Record};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const CONTACT_SELECTION: &str = "
    id
    name
    firstName
    lastName
    owner { id firstName lastName name }
    emails { email }
    phoneNumbers { e164 }
    socials { id url followersCount }
    tags { id name }
    organizations(pagination: { page: 0, limit: 100 }) { content { metadata { id } name } }
";

static CONTACTS_BY_IDS: Lazy<String> = Lazy::new(|| {
    format!(
        "query getContactsByIds($ids: [ID!]!) {{ contacts_ByIds(ids: $ids) {{ {CONTACT_SELECTION} }} }}"
    )
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Email {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhoneNumber {
    pub e164: Option<String>,
}

/// Organizations a contact works for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationPage {
    pub content: Vec<EntityRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub id: String,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub owner: Option<User>,
    pub emails: Vec<Email>,
    pub phone_numbers: Vec<PhoneNumber>,
    pub socials: Vec<Social>,
    pub tags: Vec<Tag>,
    pub organizations: OrganizationPage,
}

impl Contact {
    /// Full name, falling back to first/last name parts.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.trim().to_string();
        }
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn organization_ids(&self) -> impl Iterator<Item = &str> {
        self.organizations.content.iter().map(EntityRef::id)
    }
}

impl Record for Contact {
    const DOMAIN: DomainName = DomainName::Contacts;

    fn batch_query() -> BatchQuery {
        BatchQuery {
            document: CONTACTS_BY_IDS.as_str(),
            field: "contacts_ByIds",
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::Contact;

    #[test]
    fn display_name_falls_back_to_name_parts() {
        let mut contact = Contact {
            first_name: Some("Ada".to_string()),
            last_name: Some(" Lovelace ".to_string()),
            ..Contact::default()
        };
        assert_eq!(contact.display_name(), "Ada Lovelace");

        contact.name = Some("Countess".to_string());
        assert_eq!(contact.display_name(), "Countess");
    }
}
