//! Wire DTOs for the provider API.
//!
//! # Design
//! Every list endpoint takes the same criteria envelope: session identity
//! (`user_id`, `filiale_id`) and the date range at the top level, the
//! optional filters nested under `data`, and the `index`/`size` window.
//! Every list endpoint answers with the `Page` envelope.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::session::StoredUser;

/// Criteria endpoints of the provider API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Prestations,
    Prescriptions,
    Ordonnances,
    OrdonnanceLignes,
    Garanties,
    Assures,
    Beneficiaires,
    Prestataires,
    Actes,
    Medicaments,
    EntentesPrealables,
    Factures,
    Statistiques,
}

impl Resource {
    pub fn path(self) -> &'static str {
        match self {
            Resource::Prestations => "/prestationActe/getByCriteria",
            Resource::Prescriptions => "/prescriptionActe/getByCriteria",
            Resource::Ordonnances => "/ordonnance/getByCriteria",
            Resource::OrdonnanceLignes => "/ordonnanceLigne/getByCriteria",
            Resource::Garanties => "/garantie/getByCriteria",
            Resource::Assures => "/assure/getByCriteria",
            Resource::Beneficiaires => "/beneficiaire/getByCriteria",
            Resource::Prestataires => "/prestataire/getByCriteria",
            Resource::Actes => "/acte/getByCriteria",
            Resource::Medicaments => "/medicament/getByCriteria",
            Resource::EntentesPrealables => "/ententePrealable/getByCriteria",
            Resource::Factures => "/facture/getByCriteria",
            Resource::Statistiques => "/statistique/getByCriteria",
        }
    }
}

/// Search filter shared by the list screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub date_debut: NaiveDate,
    pub date_fin: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garantie: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matricule_assure: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prestataire_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("start date {debut} is after end date {fin}")]
pub struct InvalidDateRange {
    pub debut: NaiveDate,
    pub fin: NaiveDate,
}

impl Filter {
    pub fn new(date_debut: NaiveDate, date_fin: NaiveDate) -> Result<Self, InvalidDateRange> {
        if date_debut > date_fin {
            return Err(InvalidDateRange {
                debut: date_debut,
                fin: date_fin,
            });
        }
        Ok(Self {
            date_debut,
            date_fin,
            garantie: None,
            matricule_assure: None,
            prestataire_id: None,
        })
    }

    /// Empty or blank codes mean "all garanties".
    pub fn with_garantie(mut self, garantie: impl Into<String>) -> Self {
        let garantie = garantie.into();
        self.garantie = Some(garantie.trim().to_string()).filter(|g| !g.is_empty());
        self
    }

    pub fn with_matricule(mut self, matricule: i64) -> Self {
        self.matricule_assure = Some(matricule);
        self
    }

    pub fn with_prestataire(mut self, prestataire_id: i64) -> Self {
        self.prestataire_id = Some(prestataire_id);
        self
    }
}

/// Nested `data` object of the criteria envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garantie: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matricule_assure: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prestataire_id: Option<i64>,
}

/// Request body of every `getByCriteria` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filiale_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_debut: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_fin: Option<NaiveDate>,
    #[serde(default)]
    pub data: CriteriaData,
    pub index: u32,
    pub size: u32,
}

impl CriteriaRequest {
    /// Criteria with no filter: the first `size` records of a reference list.
    pub fn window(index: u32, size: u32) -> Self {
        Self {
            user_id: None,
            filiale_id: None,
            date_debut: None,
            date_fin: None,
            data: CriteriaData::default(),
            index,
            size,
        }
    }

    /// Combine a filter with the signed-in user's identity.
    ///
    /// `prestataire_id` falls back to the user's own provider when the
    /// filter does not name one.
    pub fn from_filter(filter: &Filter, user: Option<&StoredUser>, index: u32, size: u32) -> Self {
        Self {
            user_id: user.map(|u| u.id),
            filiale_id: user.and_then(|u| u.filiale_id),
            date_debut: Some(filter.date_debut),
            date_fin: Some(filter.date_fin),
            data: CriteriaData {
                garantie: filter.garantie.clone(),
                matricule_assure: filter.matricule_assure,
                prestataire_id: filter
                    .prestataire_id
                    .or_else(|| user.and_then(|u| u.prestataire_id)),
            },
            index,
            size,
        }
    }
}

/// Response envelope of every list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub count: u64,
    #[serde(default, rename = "hasError")]
    pub has_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, count: u64) -> Self {
        Self {
            items,
            count,
            has_error: false,
            message: None,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            count: self.count,
            has_error: self.has_error,
            message: self.message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Fields of `/user/update`; omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prenom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telephone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordChange {
    pub user_id: i64,
    pub old_password: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn user() -> StoredUser {
        StoredUser {
            id: 3,
            login: "labo".into(),
            nom: None,
            prenom: None,
            email: None,
            token: Some("t".into()),
            filiale_id: Some(1),
            prestataire_id: Some(88),
            prestataire_libelle: None,
        }
    }

    #[test]
    fn filter_rejects_inverted_range() {
        let err = Filter::new(date("2025-09-30"), date("2025-01-01")).unwrap_err();
        assert_eq!(err.debut, date("2025-09-30"));
        assert!(Filter::new(date("2025-01-01"), date("2025-01-01")).is_ok());
    }

    #[test]
    fn blank_garantie_means_all() {
        let filter = Filter::new(date("2025-01-01"), date("2025-01-31"))
            .unwrap()
            .with_garantie("  ");
        assert!(filter.garantie.is_none());
    }

    #[test]
    fn criteria_serializes_to_single_envelope() {
        let filter = Filter::new(date("2025-01-01"), date("2025-09-30"))
            .unwrap()
            .with_garantie("PHARMA")
            .with_matricule(100245);
        let criteria = CriteriaRequest::from_filter(&filter, Some(&user()), 20, 10);
        let json = serde_json::to_value(&criteria).unwrap();
        assert_eq!(json["user_id"], 3);
        assert_eq!(json["filiale_id"], 1);
        assert_eq!(json["date_debut"], "2025-01-01");
        assert_eq!(json["date_fin"], "2025-09-30");
        assert_eq!(json["data"]["garantie"], "PHARMA");
        assert_eq!(json["data"]["matricule_assure"], 100245);
        assert_eq!(json["data"]["prestataire_id"], 88);
        assert_eq!(json["index"], 20);
        assert_eq!(json["size"], 10);
    }

    #[test]
    fn explicit_prestataire_wins_over_session() {
        let filter = Filter::new(date("2025-01-01"), date("2025-01-31"))
            .unwrap()
            .with_prestataire(5);
        let criteria = CriteriaRequest::from_filter(&filter, Some(&user()), 0, 10);
        assert_eq!(criteria.data.prestataire_id, Some(5));
    }

    #[test]
    fn anonymous_criteria_omits_identity() {
        let filter = Filter::new(date("2025-01-01"), date("2025-01-31")).unwrap();
        let json =
            serde_json::to_value(CriteriaRequest::from_filter(&filter, None, 0, 10)).unwrap();
        assert!(json.get("user_id").is_none());
        assert!(json["data"].as_object().unwrap().is_empty());
    }

    #[test]
    fn page_defaults_missing_fields() {
        let page: Page<serde_json::Value> = serde_json::from_str("{}").unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.count, 0);
        assert!(!page.has_error);
    }
}
