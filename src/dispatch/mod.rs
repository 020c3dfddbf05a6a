pub mod filter;
pub mod layout;
pub mod storage;
pub mod store;
pub mod wait;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Priority levels for a call request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    pub fn next(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High => Self::Urgent,
            Self::Urgent => Self::Low,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Low => Self::Urgent,
            Self::Medium => Self::Low,
            Self::High => Self::Medium,
            Self::Urgent => Self::High,
        }
    }

    pub fn is_urgent(self) -> bool {
        matches!(self, Self::Urgent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Display label (Portuguese, matching the dispatch center's vocabulary).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Baixa",
            Self::Medium => "Média",
            Self::High => "Alta",
            Self::Urgent => "Urgente",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" | "baixa" => Ok(Self::Low),
            "medium" | "media" | "média" => Ok(Self::Medium),
            "high" | "alta" => Ok(Self::High),
            "urgent" | "urgente" => Ok(Self::Urgent),
            other => Err(format!(
                "unknown priority '{other}': use low, medium, high, urgent"
            )),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline status of a call request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Triage,
    Allocated,
    EnRoute,
    Completed,
    Cancelled,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Self::Triage,
        Self::Allocated,
        Self::EnRoute,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Triage => "triage",
            Self::Allocated => "allocated",
            Self::EnRoute => "en_route",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Display label (Portuguese).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Triage => "Triagem",
            Self::Allocated => "Alocado",
            Self::EnRoute => "Em Deslocamento",
            Self::Completed => "Concluído",
            Self::Cancelled => "Cancelado",
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "triage" => Ok(Self::Triage),
            "allocated" => Ok(Self::Allocated),
            "en_route" | "en-route" => Ok(Self::EnRoute),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!(
                "unknown status '{other}': use triage, allocated, en_route, completed, cancelled"
            )),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic point attached to a request at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

// Base point: Jales - SP. The fake geocoder spreads addresses around it.
const BASE_LAT: f64 = -20.2689;
const BASE_LNG: f64 = -50.5458;

/// Deterministic fake geocoder: offsets the base point by a char-code hash
/// of the address. Not a real geocoding service.
pub fn pseudo_geocode(address: &str) -> Coordinates {
    let hash: u32 = address
        .chars()
        .fold(0u32, |acc, c| acc.wrapping_add(c as u32));
    let offset = f64::from(hash % 100) / 1000.0;
    Coordinates {
        lat: BASE_LAT + offset,
        lng: BASE_LNG + offset,
    }
}

/// A single ambulance transport request ("chamado").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    /// Creation timestamp in Unix milliseconds. Immutable.
    pub id: i64,
    pub patient: String,
    pub phone: String,
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub notes: String,
    pub coords: Coordinates,
    pub created_at: DateTime<Utc>,
}

impl CallRequest {
    pub fn is_urgent(&self) -> bool {
        self.priority.is_urgent()
    }
}

/// Fields collected by the request form. The store fills in everything else.
#[derive(Debug, Clone, Default)]
pub struct RequestDraft {
    pub patient: String,
    pub phone: String,
    pub origin: String,
    pub destination: String,
    pub priority: Priority,
    pub notes: String,
}

/// A partial update to an existing request. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct RequestPatch {
    pub patient: Option<String>,
    pub phone: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub notes: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
}

impl RequestPatch {
    pub fn priority(priority: Priority) -> Self {
        Self {
            priority: Some(priority),
            ..Self::default()
        }
    }

    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Demonstration dataset used when no persisted collection exists.
pub fn seed_requests(now: DateTime<Utc>) -> Vec<CallRequest> {
    let seed = |id: i64,
                patient: &str,
                phone: &str,
                origin: &str,
                destination: &str,
                priority: Priority,
                status: Status,
                notes: &str,
                minutes_ago: i64| CallRequest {
        id,
        patient: patient.into(),
        phone: phone.into(),
        origin: origin.into(),
        destination: destination.into(),
        priority,
        status,
        notes: notes.into(),
        coords: pseudo_geocode(origin),
        created_at: now - TimeDelta::minutes(minutes_ago),
    };

    vec![
        seed(
            1,
            "João Silva",
            "(17) 98765-4321",
            "Rua São Paulo, 123 - Centro, Jales - SP",
            "Hospital Regional de Jales",
            Priority::Urgent,
            Status::Triage,
            "Paciente com dificuldade respiratória",
            5,
        ),
        seed(
            2,
            "Maria Santos",
            "(17) 91234-5678",
            "Av. Francisco Jalles, 456 - Vila Cardia, Jales - SP",
            "Hospital São Francisco",
            Priority::High,
            Status::Allocated,
            "Transporte de rotina",
            15,
        ),
        seed(
            3,
            "Pedro Costa",
            "(17) 99876-5432",
            "Rua Prudente de Moraes, 789 - Jardim São Paulo, Jales - SP",
            "Clínica Santa Maria",
            Priority::Medium,
            Status::EnRoute,
            "",
            8,
        ),
    ]
}
