use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub login: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub nom: Option<String>,
    pub prenom: Option<String>,
    pub email: Option<String>,
    pub filiale_id: i64,
    pub prestataire_id: i64,
    pub prestataire_libelle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prestation {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beneficiaire_nom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beneficiaire_prenom: Option<String>,
    pub matricule_assure: i64,
    pub libelle_acte: String,
    pub code_garantie: String,
    pub libelle_garantie: String,
    pub montant_acte: f64,
    pub montant_pris_en_charge: f64,
    pub date_prestation: NaiveDate,
    pub statut: String,
    pub prestataire_id: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: i64,
    pub beneficiaire_nom: Option<String>,
    pub beneficiaire_prenom: Option<String>,
    pub matricule_assure: i64,
    pub libelle_medicament: String,
    pub code_garantie: String,
    pub libelle_garantie: String,
    pub quantite: u32,
    pub prix_unitaire: f64,
    pub date_prescription: NaiveDate,
    pub is_entente_prealable: bool,
    pub medecin_nom: String,
    pub statut: String,
    pub prestataire_id: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ordonnance {
    pub id: i64,
    pub numero: String,
    pub beneficiaire_nom: Option<String>,
    pub beneficiaire_prenom: Option<String>,
    pub matricule_assure: i64,
    pub medecin_nom: String,
    pub code_garantie: String,
    pub libelle_garantie: String,
    pub date_ordonnance: NaiveDate,
    pub montant_total: f64,
    pub nombre_lignes: u32,
    pub statut: String,
    pub prestataire_id: i64,
}

/// Fields every criteria-searchable record exposes.
trait Record: Clone {
    fn date(&self) -> NaiveDate;
    fn garantie(&self) -> &str;
    fn matricule(&self) -> i64;
    fn prestataire(&self) -> i64;
    fn id(&self) -> i64;
}

impl Record for Prestation {
    fn date(&self) -> NaiveDate {
        self.date_prestation
    }
    fn garantie(&self) -> &str {
        &self.code_garantie
    }
    fn matricule(&self) -> i64 {
        self.matricule_assure
    }
    fn prestataire(&self) -> i64 {
        self.prestataire_id
    }
    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for Prescription {
    fn date(&self) -> NaiveDate {
        self.date_prescription
    }
    fn garantie(&self) -> &str {
        &self.code_garantie
    }
    fn matricule(&self) -> i64 {
        self.matricule_assure
    }
    fn prestataire(&self) -> i64 {
        self.prestataire_id
    }
    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for Ordonnance {
    fn date(&self) -> NaiveDate {
        self.date_ordonnance
    }
    fn garantie(&self) -> &str {
        &self.code_garantie
    }
    fn matricule(&self) -> i64 {
        self.matricule_assure
    }
    fn prestataire(&self) -> i64 {
        self.prestataire_id
    }
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CriteriaData {
    pub garantie: Option<String>,
    pub matricule_assure: Option<i64>,
    pub prestataire_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Criteria {
    pub user_id: Option<i64>,
    pub filiale_id: Option<i64>,
    pub date_debut: Option<NaiveDate>,
    pub date_fin: Option<NaiveDate>,
    #[serde(default)]
    pub data: CriteriaData,
    #[serde(default)]
    pub index: usize,
    #[serde(default = "default_size")]
    pub size: usize,
}

fn default_size() -> usize {
    10
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub items: Vec<T>,
    pub count: usize,
    #[serde(rename = "hasError")]
    pub has_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    fn ok(items: Vec<T>, count: usize) -> Self {
        Self {
            items,
            count,
            has_error: false,
            message: None,
        }
    }

    fn rejected(message: &str) -> Self {
        Self {
            items: Vec::new(),
            count: 0,
            has_error: true,
            message: Some(message.to_string()),
        }
    }
}

#[derive(Deserialize)]
pub struct LoginInput {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Default)]
pub struct Db {
    pub users: Vec<User>,
    pub tokens: HashMap<String, i64>,
    pub prestations: Vec<Prestation>,
    pub prescriptions: Vec<Prescription>,
    pub ordonnances: Vec<Ordonnance>,
}

pub type SharedDb = Arc<RwLock<Db>>;

pub const PHARMACIE_ID: i64 = 41;
pub const CLINIQUE_ID: i64 = 52;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

const MATRICULES: [i64; 3] = [100245, 100246, 100247];
const NOMS: [(&str, &str); 3] = [("Traore", "Issa"), ("Kouame", "Adjoua"), ("Diallo", "Mariam")];

/// Garantie code, garantie label, act label.
type Acte = (&'static str, &'static str, &'static str);
const PHARMA: Acte = ("PHARMA", "Pharmacie", "Délivrance médicaments");
const HOSPI: Acte = ("HOSPI", "Hospitalisation", "Nuitée");

/// Deterministic data set.
///
/// The pharmacy (`PHARMACIE_ID`) has exactly 15 PHARMA prestations between
/// 2025-01-01 and 2025-09-30, plus records that each filter must exclude.
pub fn seed() -> Db {
    let users = vec![
        User {
            id: 7,
            login: "pharma.centre".to_string(),
            password: "secret".to_string(),
            nom: Some("Kouassi".to_string()),
            prenom: Some("Awa".to_string()),
            email: Some("awa.kouassi@pharmacie-centre.example".to_string()),
            filiale_id: 2,
            prestataire_id: PHARMACIE_ID,
            prestataire_libelle: "Pharmacie du Centre".to_string(),
            token: None,
        },
        User {
            id: 8,
            login: "clinique.espoir".to_string(),
            password: "secret".to_string(),
            nom: Some("Bamba".to_string()),
            prenom: Some("Moussa".to_string()),
            email: None,
            filiale_id: 2,
            prestataire_id: CLINIQUE_ID,
            prestataire_libelle: "Clinique Espoir".to_string(),
            token: None,
        },
    ];

    let mut prestations = Vec::new();
    let mut next_id = 1;
    let mut push = |kind: Acte, day: NaiveDate, prestataire: i64, named: bool| {
        let (code, libelle, acte) = kind;
        let i = (next_id as usize) % 3;
        let (nom, prenom) = NOMS[i];
        prestations.push(Prestation {
            id: next_id,
            beneficiaire_nom: named.then(|| nom.to_string()),
            beneficiaire_prenom: named.then(|| prenom.to_string()),
            matricule_assure: MATRICULES[i],
            libelle_acte: acte.to_string(),
            code_garantie: code.to_string(),
            libelle_garantie: libelle.to_string(),
            montant_acte: 5000.0 + 250.0 * next_id as f64,
            montant_pris_en_charge: 4000.0 + 200.0 * next_id as f64,
            date_prestation: day,
            statut: "VALIDE".to_string(),
            prestataire_id: prestataire,
        });
        next_id += 1;
    };

    let start = date(2025, 1, 5);
    for i in 0..15 {
        push(PHARMA, start + Duration::days(i * 17), PHARMACIE_ID, i != 3);
    }
    for i in 0..6 {
        push(HOSPI, start + Duration::days(i * 30), PHARMACIE_ID, true);
    }
    for i in 0..4 {
        push(PHARMA, date(2024, 6, 1) + Duration::days(i * 20), PHARMACIE_ID, true);
    }
    for i in 0..5 {
        push(PHARMA, start + Duration::days(i * 10), CLINIQUE_ID, true);
    }

    let prescriptions = (0..12)
        .map(|i| {
            let (nom, prenom) = NOMS[(i % 3) as usize];
            Prescription {
                id: 1000 + i,
                beneficiaire_nom: Some(nom.to_string()),
                beneficiaire_prenom: Some(prenom.to_string()),
                matricule_assure: MATRICULES[(i % 3) as usize],
                libelle_medicament: format!("Amoxicilline {}mg", 250 * (1 + i % 2)),
                code_garantie: "PHARMA".to_string(),
                libelle_garantie: "Pharmacie".to_string(),
                quantite: 1 + (i % 3) as u32,
                prix_unitaire: 1500.0,
                date_prescription: start + Duration::days(i * 14),
                is_entente_prealable: i % 4 == 0,
                medecin_nom: "Dr Yao".to_string(),
                statut: "EN_ATTENTE".to_string(),
                prestataire_id: PHARMACIE_ID,
            }
        })
        .collect();

    let ordonnances = (0..8)
        .map(|i| {
            let (nom, prenom) = NOMS[(i % 3) as usize];
            Ordonnance {
                id: 2000 + i,
                numero: format!("ORD-2025-{:04}", i + 1),
                beneficiaire_nom: Some(nom.to_string()),
                beneficiaire_prenom: Some(prenom.to_string()),
                matricule_assure: MATRICULES[(i % 3) as usize],
                medecin_nom: "Dr Yao".to_string(),
                code_garantie: "PHARMA".to_string(),
                libelle_garantie: "Pharmacie".to_string(),
                date_ordonnance: start + Duration::days(i * 21),
                montant_total: 7500.0 + 500.0 * i as f64,
                nombre_lignes: 1 + (i % 4) as u32,
                statut: "SERVIE".to_string(),
                prestataire_id: PHARMACIE_ID,
            }
        })
        .collect();

    Db {
        users,
        tokens: HashMap::new(),
        prestations,
        prescriptions,
        ordonnances,
    }
}

pub fn app() -> Router {
    app_with(seed())
}

pub fn app_with(db: Db) -> Router {
    let db: SharedDb = Arc::new(RwLock::new(db));
    Router::new()
        .route("/user/login", post(login))
        .route("/user/logout", post(logout))
        .route("/user/{id}", get(get_user))
        .route("/prestationActe/getByCriteria", post(list_prestations))
        .route("/prescriptionActe/getByCriteria", post(list_prescriptions))
        .route("/ordonnance/getByCriteria", post(list_ordonnances))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the caller's user id from the bearer token.
fn authorize(db: &Db, headers: &HeaderMap) -> Result<i64, StatusCode> {
    let token = bearer(headers).ok_or(StatusCode::UNAUTHORIZED)?;
    db.tokens.get(token).copied().ok_or(StatusCode::UNAUTHORIZED)
}

fn search<T: Record>(rows: &[T], criteria: &Criteria) -> Envelope<T> {
    let garantie = criteria.data.garantie.as_deref().filter(|g| !g.is_empty());
    let mut matching: Vec<&T> = rows
        .iter()
        .filter(|r| criteria.date_debut.is_none_or(|d| r.date() >= d))
        .filter(|r| criteria.date_fin.is_none_or(|d| r.date() <= d))
        .filter(|r| garantie.is_none_or(|g| r.garantie() == g))
        .filter(|r| criteria.data.matricule_assure.is_none_or(|m| r.matricule() == m))
        .filter(|r| criteria.data.prestataire_id.is_none_or(|p| r.prestataire() == p))
        .collect();
    matching.sort_by(|a, b| b.date().cmp(&a.date()).then(a.id().cmp(&b.id())));
    let count = matching.len();
    let items = matching
        .into_iter()
        .skip(criteria.index)
        .take(criteria.size)
        .cloned()
        .collect();
    Envelope::ok(items, count)
}

async fn login(State(db): State<SharedDb>, Json(input): Json<LoginInput>) -> Json<Envelope<User>> {
    let mut db = db.write().await;
    let Some(mut user) = db
        .users
        .iter()
        .find(|u| u.login == input.login && u.password == input.password)
        .cloned()
    else {
        tracing::info!(login = %input.login, "login refused");
        return Json(Envelope::rejected("Identifiants incorrects"));
    };
    let token = Uuid::new_v4().to_string();
    db.tokens.insert(token.clone(), user.id);
    user.token = Some(token);
    tracing::info!(user_id = user.id, "login accepted");
    Json(Envelope::ok(vec![user], 1))
}

async fn logout(
    State(db): State<SharedDb>,
    headers: HeaderMap,
) -> Result<Json<Envelope<User>>, StatusCode> {
    let mut db = db.write().await;
    authorize(&db, &headers)?;
    if let Some(token) = bearer(&headers) {
        db.tokens.remove(token);
    }
    Ok(Json(Envelope::ok(Vec::new(), 0)))
}

async fn get_user(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Envelope<User>>, StatusCode> {
    let db = db.read().await;
    authorize(&db, &headers)?;
    let user = db
        .users
        .iter()
        .find(|u| u.id == id)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(Envelope::ok(vec![user], 1)))
}

async fn list_prestations(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Json(criteria): Json<Criteria>,
) -> Result<Json<Envelope<Prestation>>, StatusCode> {
    let db = db.read().await;
    let caller = authorize(&db, &headers)?;
    tracing::debug!(caller, index = criteria.index, size = criteria.size, "prestations search");
    Ok(Json(search(&db.prestations, &criteria)))
}

async fn list_prescriptions(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Json(criteria): Json<Criteria>,
) -> Result<Json<Envelope<Prescription>>, StatusCode> {
    let db = db.read().await;
    let caller = authorize(&db, &headers)?;
    tracing::debug!(caller, index = criteria.index, size = criteria.size, "prescriptions search");
    Ok(Json(search(&db.prescriptions, &criteria)))
}

async fn list_ordonnances(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Json(criteria): Json<Criteria>,
) -> Result<Json<Envelope<Ordonnance>>, StatusCode> {
    let db = db.read().await;
    let caller = authorize(&db, &headers)?;
    tracing::debug!(caller, index = criteria.index, size = criteria.size, "ordonnances search");
    Ok(Json(search(&db.ordonnances, &criteria)))
}
