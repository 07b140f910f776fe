//! View-models for the list screens.
//!
//! Raw server records are deserialized leniently (every field optional) and
//! mapped field by field into the shapes the screens render. Missing text
//! becomes `NON_RENSEIGNE`, missing amounts `0.0`, missing flags `false`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::Resource;

pub const NON_RENSEIGNE: &str = "Non renseigné";

/// A list row type: its endpoint, its raw record, and the mapping between.
pub trait ListItem: Sized {
    type Raw: DeserializeOwned;

    const RESOURCE: Resource;

    fn from_raw(raw: Self::Raw) -> Self;
}

fn text(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| NON_RENSEIGNE.to_string())
}

fn full_name(nom: Option<String>, prenom: Option<String>) -> String {
    let parts: Vec<String> = [prenom, nom]
        .into_iter()
        .flatten()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        NON_RENSEIGNE.to_string()
    } else {
        parts.join(" ")
    }
}

/// A coverage line, as offered in the filter picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Garantie {
    pub code: String,
    pub libelle: String,
}

// ---------------------------------------------------------------------------
// Prestation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPrestation {
    pub id: i64,
    pub beneficiaire_nom: Option<String>,
    pub beneficiaire_prenom: Option<String>,
    pub matricule_assure: Option<i64>,
    pub libelle_acte: Option<String>,
    pub libelle_garantie: Option<String>,
    pub code_garantie: Option<String>,
    pub montant_acte: Option<f64>,
    pub montant_pris_en_charge: Option<f64>,
    pub date_prestation: Option<String>,
    pub statut: Option<String>,
}

/// A billable act rendered to an insured member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prestation {
    pub id: i64,
    pub beneficiaire_nom: String,
    pub matricule_assure: Option<i64>,
    pub acte_libelle: String,
    pub garantie_libelle: String,
    pub garantie_code: Option<String>,
    pub montant: f64,
    pub montant_pris_en_charge: f64,
    pub date_prestation: String,
    pub statut: String,
}

impl Prestation {
    /// Share left to the member.
    pub fn ticket_moderateur(&self) -> f64 {
        (self.montant - self.montant_pris_en_charge).max(0.0)
    }
}

impl ListItem for Prestation {
    type Raw = RawPrestation;

    const RESOURCE: Resource = Resource::Prestations;

    fn from_raw(raw: RawPrestation) -> Self {
        Self {
            id: raw.id,
            beneficiaire_nom: full_name(raw.beneficiaire_nom, raw.beneficiaire_prenom),
            matricule_assure: raw.matricule_assure,
            acte_libelle: text(raw.libelle_acte),
            garantie_libelle: text(raw.libelle_garantie),
            garantie_code: raw.code_garantie,
            montant: raw.montant_acte.unwrap_or(0.0),
            montant_pris_en_charge: raw.montant_pris_en_charge.unwrap_or(0.0),
            date_prestation: text(raw.date_prestation),
            statut: text(raw.statut),
        }
    }
}

// ---------------------------------------------------------------------------
// Prescription
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPrescription {
    pub id: i64,
    pub beneficiaire_nom: Option<String>,
    pub beneficiaire_prenom: Option<String>,
    pub matricule_assure: Option<i64>,
    pub libelle_acte: Option<String>,
    pub libelle_medicament: Option<String>,
    pub libelle_garantie: Option<String>,
    pub quantite: Option<u32>,
    pub prix_unitaire: Option<f64>,
    pub date_prescription: Option<String>,
    pub is_entente_prealable: Option<bool>,
    pub medecin_nom: Option<String>,
    pub statut: Option<String>,
}

/// A prescribed act or drug, possibly subject to prior authorization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prescription {
    pub id: i64,
    pub beneficiaire_nom: String,
    pub matricule_assure: Option<i64>,
    pub libelle: String,
    pub garantie_libelle: String,
    pub quantite: u32,
    pub prix_unitaire: f64,
    pub montant: f64,
    pub date_prescription: String,
    pub entente_prealable: bool,
    pub medecin_nom: String,
    pub statut: String,
}

impl ListItem for Prescription {
    type Raw = RawPrescription;

    const RESOURCE: Resource = Resource::Prescriptions;

    fn from_raw(raw: RawPrescription) -> Self {
        let quantite = raw.quantite.unwrap_or(1);
        let prix_unitaire = raw.prix_unitaire.unwrap_or(0.0);
        Self {
            id: raw.id,
            beneficiaire_nom: full_name(raw.beneficiaire_nom, raw.beneficiaire_prenom),
            matricule_assure: raw.matricule_assure,
            libelle: text(raw.libelle_medicament.or(raw.libelle_acte)),
            garantie_libelle: text(raw.libelle_garantie),
            quantite,
            prix_unitaire,
            montant: prix_unitaire * f64::from(quantite),
            date_prescription: text(raw.date_prescription),
            entente_prealable: raw.is_entente_prealable.unwrap_or(false),
            medecin_nom: text(raw.medecin_nom),
            statut: text(raw.statut),
        }
    }
}

// ---------------------------------------------------------------------------
// Ordonnance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawOrdonnance {
    pub id: i64,
    pub numero: Option<String>,
    pub beneficiaire_nom: Option<String>,
    pub beneficiaire_prenom: Option<String>,
    pub matricule_assure: Option<i64>,
    pub medecin_nom: Option<String>,
    pub libelle_garantie: Option<String>,
    pub date_ordonnance: Option<String>,
    pub montant_total: Option<f64>,
    pub nombre_lignes: Option<u32>,
    pub statut: Option<String>,
}

/// A prescription order addressed to a pharmacy-type provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ordonnance {
    pub id: i64,
    pub numero: String,
    pub beneficiaire_nom: String,
    pub matricule_assure: Option<i64>,
    pub medecin_nom: String,
    pub garantie_libelle: String,
    pub date_ordonnance: String,
    pub montant_total: f64,
    pub nombre_lignes: u32,
    pub statut: String,
}

impl ListItem for Ordonnance {
    type Raw = RawOrdonnance;

    const RESOURCE: Resource = Resource::Ordonnances;

    fn from_raw(raw: RawOrdonnance) -> Self {
        Self {
            id: raw.id,
            numero: text(raw.numero),
            beneficiaire_nom: full_name(raw.beneficiaire_nom, raw.beneficiaire_prenom),
            matricule_assure: raw.matricule_assure,
            medecin_nom: text(raw.medecin_nom),
            garantie_libelle: text(raw.libelle_garantie),
            date_ordonnance: text(raw.date_ordonnance),
            montant_total: raw.montant_total.unwrap_or(0.0),
            nombre_lignes: raw.nombre_lignes.unwrap_or(0),
            statut: text(raw.statut),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prestation(json: &str) -> Prestation {
        Prestation::from_raw(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn missing_fields_fall_back_to_placeholder() {
        let p = prestation(r#"{"id": 4}"#);
        assert_eq!(p.id, 4);
        assert_eq!(p.beneficiaire_nom, NON_RENSEIGNE);
        assert_eq!(p.acte_libelle, NON_RENSEIGNE);
        assert_eq!(p.garantie_libelle, NON_RENSEIGNE);
        assert_eq!(p.montant, 0.0);
        assert_eq!(p.statut, NON_RENSEIGNE);
    }

    #[test]
    fn null_and_blank_fields_fall_back_too() {
        let p = prestation(r#"{"id": 4, "beneficiaireNom": null, "libelleActe": "   "}"#);
        assert_eq!(p.beneficiaire_nom, NON_RENSEIGNE);
        assert_eq!(p.acte_libelle, NON_RENSEIGNE);
    }

    #[test]
    fn prestation_maps_server_fields() {
        let p = prestation(
            r#"{"id": 9, "beneficiaireNom": "Traore", "beneficiairePrenom": "Issa",
                "matriculeAssure": 100245, "libelleActe": "Consultation",
                "libelleGarantie": "Pharmacie", "codeGarantie": "PHARMA",
                "montantActe": 15000.0, "montantPrisEnCharge": 12000.0,
                "datePrestation": "2025-03-02", "statut": "VALIDE"}"#,
        );
        assert_eq!(p.beneficiaire_nom, "Issa Traore");
        assert_eq!(p.garantie_code.as_deref(), Some("PHARMA"));
        assert_eq!(p.ticket_moderateur(), 3000.0);
    }

    #[test]
    fn prescription_prefers_medicament_label_and_computes_amount() {
        let raw: RawPrescription = serde_json::from_str(
            r#"{"id": 1, "libelleActe": "Acte", "libelleMedicament": "Paracetamol 500mg",
                "quantite": 3, "prixUnitaire": 1200.0, "isEntentePrealable": true}"#,
        )
        .unwrap();
        let p = Prescription::from_raw(raw);
        assert_eq!(p.libelle, "Paracetamol 500mg");
        assert_eq!(p.montant, 3600.0);
        assert!(p.entente_prealable);
        assert_eq!(p.medecin_nom, NON_RENSEIGNE);
    }

    #[test]
    fn ordonnance_defaults_counts() {
        let raw: RawOrdonnance = serde_json::from_str(r#"{"id": 2, "numero": "ORD-2"}"#).unwrap();
        let o = Ordonnance::from_raw(raw);
        assert_eq!(o.numero, "ORD-2");
        assert_eq!(o.nombre_lignes, 0);
        assert_eq!(o.beneficiaire_nom, NON_RENSEIGNE);
    }
}
