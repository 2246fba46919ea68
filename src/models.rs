use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::validation::{EmailAddress, PhoneNumber};

/// Schema version every client payload must carry.
pub const SCHEMA_VERSION: &str = "1.2.0";

/// Declares a string-valued enum together with its wire spellings.
macro_rules! choice_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }
    };
}

// ============ Funnel Stage ============

/// Position of a lead in the funnel, ordered from least to most complete.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LeadStage {
    #[default]
    Minimal,
    Qualification,
    Discovery,
    Selling,
}

impl LeadStage {
    /// All stages, least complete first.
    pub const ALL: [LeadStage; 4] = [
        LeadStage::Minimal,
        LeadStage::Qualification,
        LeadStage::Discovery,
        LeadStage::Selling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStage::Minimal => "minimal",
            LeadStage::Qualification => "qualification",
            LeadStage::Discovery => "discovery",
            LeadStage::Selling => "selling",
        }
    }
}

impl fmt::Display for LeadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("Unknown lead stage '{}'", s))
    }
}

// ============ Minimal Stage ============

/// Name and reachability of the prospect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactInformation {
    #[schemars(length(min = 1))]
    pub first_name: String,
    #[schemars(length(min = 1))]
    pub last_name: String,
    /// Whitespace-free, `+49`-prefixed.
    pub phone: PhoneNumber,
    pub email: EmailAddress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub contact_information: ContactInformation,
}

/// First contact: just enough to reach the prospect again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MinimalLead {
    #[schemars(schema_with = "crate::validation::version_schema")]
    pub version: String,
    pub contact: Contact,
}

// ============ Qualification Stage ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[schemars(length(min = 1))]
    pub street: String,
    #[schemars(length(min = 1))]
    pub city: String,
    #[schemars(length(min = 1))]
    pub postal_code: String,
    #[schemars(length(min = 1))]
    pub country_code: String,
}

/// Minimal contact plus a postal address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QualificationContact {
    #[serde(flatten)]
    pub base: Contact,
    pub address: Address,
}

choice_enum! {
    ImmoType {
        SingleOrTwoFamilyHouse => "Single-family / Two-family house",
        SemiDetachedOrTerracedHouse => "Semi-detached / Terraced house",
        Apartment => "Apartment",
        Commercial => "Commercial",
        MultiFamilyHouse => "Multi-family house",
        Other => "Other",
    }
}

choice_enum! {
    YesNo {
        Yes => "Yes",
        No => "No",
    }
}

choice_enum! {
    BoilerRoomSize {
        LessThan4Sqm => "less than 4 sqm",
        MoreThan4Sqm => "more than 4 sqm",
    }
}

choice_enum! {
    CeilingHeight {
        LowerThan180Cm => "lower than 180 cm",
        Between180And199Cm => "180 - 199 cm",
        HigherThan199Cm => "higher than 199 cm",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildingInformation {
    pub immo_type: ImmoType,
    pub construction_year_string: String,
    pub heritage_protection: YesNo,
    pub boiler_room_size: BoilerRoomSize,
    pub installation_location_ceiling_height: CeilingHeight,
    pub width_pathway: YesNo,
    pub height_pathway: YesNo,
    pub persons_household: f64,
}

choice_enum! {
    OwnershipType {
        OneOwner => "one_owner",
        TwoOwners => "two_owners",
        CommunityOfOwners => "community_of_owners",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OwnershipRelationships {
    #[serde(rename = "type")]
    pub ownership_type: OwnershipType,
}

choice_enum! {
    HeatingLocation {
        UnderTheRoof => "Under the roof",
        InTheBasement => "In the basement",
        OnGroundFloor => "On ground floor",
        FirstFloor => "1st floor",
        Attic => "Attic",
        UpperFloor => "Upper floor",
        Basement => "Basement",
        GroundFloor => "Ground floor",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnergyRelevantInformation {
    pub heated_area: f64,
    pub location_heating: HeatingLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    pub address: Address,
    pub building_information: BuildingInformation,
    pub ownership_relationships: OwnershipRelationships,
    pub energy_relevant_information: EnergyRelevantInformation,
}

choice_enum! {
    HeatingSystemType {
        DistrictHeating => "District heating",
        GasFloorHeating => "Gas floor heating",
        Coal => "Coal",
        HeatingOil => "Heating oil",
        HeatPump => "Heat pump",
        NaturalGas => "Natural gas",
        LiquidGas => "Liquid gas",
        PelletOrWood => "Pellet/Wood heating",
        Other => "Other",
    }
}

choice_enum! {
    ConsumptionUnit {
        Liters => "Liters (l)",
        KilowattHours => "Kilowatt hours (kWh)",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeatingSystem {
    pub system_type: HeatingSystemType,
    pub consumption: f64,
    pub consumption_unit: ConsumptionUnit,
}

choice_enum! {
    Timeline {
        Immediately => "Immediately",
        OneToThreeMonths => "1-3 months",
        ThreeToSixMonths => "3-6 months",
        MoreThanSixMonths => ">6 months",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    pub timeline: Timeline,
}

/// Contact, building, current heating and project horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QualificationLead {
    #[schemars(schema_with = "crate::validation::version_schema")]
    pub version: String,
    pub contact: QualificationContact,
    pub building: Building,
    pub heating_system: HeatingSystem,
    pub project: Project,
}

// ============ Discovery Stage ============

choice_enum! {
    RoomsBetween {
        NoRoom => "no_room",
        OneRoom => "one_room",
        TwoRoomsOrMore => "two_rooms_or_more",
    }
}

choice_enum! {
    FloorLocation {
        Basement => "Basement",
        GroundFloor => "Ground floor",
        UpperFloor => "Upper floor",
        Attic => "Attic",
    }
}

choice_enum! {
    GroundingType {
        WaterOrGasPipe => "water_or_gas_pipe",
        GroundingSpikeOrFoundation => "grounding_spike_or_foundation",
        NoGrounding => "no_grounding",
        Unknown => "unknown",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryBuildingInformation {
    #[serde(flatten)]
    pub base: BuildingInformation,
    pub living_space: f64,
    pub residential_units: f64,
    pub rooms_between_heating_room_and_outdoor_unit: RoomsBetween,
    pub meter_closet_location: FloorLocation,
    pub electricity_connection_location: FloorLocation,
    pub grounding_type: GroundingType,
    pub has_solar_thermal_system: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryOwnershipRelationships {
    #[serde(flatten)]
    pub base: OwnershipRelationships,
    pub owner_occupied_housing: bool,
}

choice_enum! {
    TypeOfHeating {
        Radiator => "Radiator",
        FloorHeating => "Floor heating",
        RadiatorAndFloorHeating => "Radiator + Floor heating",
        NightStorageHeater => "Night storage heater",
        Other => "Other",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryEnergyRelevantInformation {
    #[serde(flatten)]
    pub base: EnergyRelevantInformation,
    pub type_of_heating: TypeOfHeating,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryBuilding {
    pub address: Address,
    pub building_information: DiscoveryBuildingInformation,
    pub ownership_relationships: DiscoveryOwnershipRelationships,
    pub energy_relevant_information: DiscoveryEnergyRelevantInformation,
}

choice_enum! {
    CirculationPump {
        No => "no",
        Unknown => "unknown",
        YesButInactive => "yes_but_inactive",
        YesAndActive => "yes_and_active",
    }
}

choice_enum! {
    WaterStation {
        No => "no",
        Unknown => "unknown",
        Yes => "yes",
        WaterFilterAndPressureReducer => "water_filter_and_pressure_reducer",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryHeatingSystem {
    #[serde(flatten)]
    pub base: HeatingSystem,
    pub construction_year_heating_system: f64,
    pub floor_heating_connected_to_return_pipe: bool,
    pub floor_heating_own_heating_circuit: bool,
    pub floor_heating_only_in_small_rooms: bool,
    pub number_of_floor_heating_distributors: f64,
    pub number_of_radiators: f64,
    pub domestic_hot_water_by_heatpump: bool,
    pub domestic_hot_water_circulation_pump: CirculationPump,
    // Clients send this one key in snake_case.
    #[serde(rename = "domestic_water_station")]
    pub domestic_water_station: WaterStation,
}

choice_enum! {
    HouseholdIncome {
        MoreThan40kGross => "more_than_40k_gross",
        LessThan40kGross => "less_than_40k_gross",
        NoAnswer => "no_answer",
    }
}

choice_enum! {
    FoundationConstruction {
        Vamo => "Vamo",
        Customer => "Customer",
        NotNecessary => "No foundation necessary",
    }
}

choice_enum! {
    DisposalOption {
        OilTankPlasticUpTo5000l => "oil_tank_plastic_up_to_5000l",
        OilTankPlasticMoreThan5000l => "oil_tank_plastic_more_than_5000l",
        OilTankSteelUpTo5000l => "oil_tank_steel_up_to_5000l",
        OilTankSteelMoreThan5000l => "oil_tank_steel_more_than_5000l",
        Heatpump => "heatpump",
        LiquidGasTank => "liquid_gas_tank",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryProject {
    #[serde(flatten)]
    pub base: Project,
    pub household_income: HouseholdIncome,
    pub status_of_foundation_construction: FoundationConstruction,
    pub full_replacement_of_heating_system_planned: bool,
    pub additional_disposal: Vec<DisposalOption>,
}

/// Qualification data with every building, heating and project block deepened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryLead {
    #[schemars(schema_with = "crate::validation::version_schema")]
    pub version: String,
    pub contact: QualificationContact,
    pub building: DiscoveryBuilding,
    pub heating_system: DiscoveryHeatingSystem,
    pub project: DiscoveryProject,
}

// ============ Selling Stage ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Picture {
    #[schemars(schema_with = "crate::validation::picture_url_schema")]
    pub url: String,
}

/// The six photo slots a site survey needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pictures {
    pub outdoor_unit_location: Vec<Picture>,
    pub outdoor_unit_location_with_area: Vec<Picture>,
    pub heating_room: Vec<Picture>,
    pub meter_closet_with_door_open: Vec<Picture>,
    pub meter_closet_sls_switch_detailed: Vec<Picture>,
    pub floor_heating_distribution_with_door_open: Vec<Picture>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SellingProject {
    #[serde(flatten)]
    pub base: DiscoveryProject,
    pub pictures: Pictures,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SellingLead {
    #[schemars(schema_with = "crate::validation::version_schema")]
    pub version: String,
    pub contact: QualificationContact,
    pub building: DiscoveryBuilding,
    pub heating_system: DiscoveryHeatingSystem,
    pub project: SellingProject,
}

// ============ Lead Request ============

/// A validated stage payload, tagged by `leadStage`.
///
/// Built only through [`crate::validation::parse_lead`], so every value satisfies
/// the schema of its own stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "leadStage", rename_all = "lowercase")]
pub enum LeadRequest {
    Minimal(MinimalLead),
    Qualification(QualificationLead),
    Discovery(DiscoveryLead),
    Selling(SellingLead),
}

/// The natural key of a lead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub email: String,
    pub phone: String,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.email, self.phone)
    }
}

impl LeadRequest {
    pub fn stage(&self) -> LeadStage {
        match self {
            LeadRequest::Minimal(_) => LeadStage::Minimal,
            LeadRequest::Qualification(_) => LeadStage::Qualification,
            LeadRequest::Discovery(_) => LeadStage::Discovery,
            LeadRequest::Selling(_) => LeadStage::Selling,
        }
    }

    pub fn version(&self) -> &str {
        match self {
            LeadRequest::Minimal(lead) => &lead.version,
            LeadRequest::Qualification(lead) => &lead.version,
            LeadRequest::Discovery(lead) => &lead.version,
            LeadRequest::Selling(lead) => &lead.version,
        }
    }

    pub fn contact_information(&self) -> &ContactInformation {
        match self {
            LeadRequest::Minimal(lead) => &lead.contact.contact_information,
            LeadRequest::Qualification(lead) => &lead.contact.base.contact_information,
            LeadRequest::Discovery(lead) => &lead.contact.base.contact_information,
            LeadRequest::Selling(lead) => &lead.contact.base.contact_information,
        }
    }

    pub fn identity(&self) -> Identity {
        let info = self.contact_information();
        Identity {
            email: info.email.as_str().to_string(),
            phone: info.phone.as_str().to_string(),
        }
    }

    /// The document persisted for this lead, `leadStage` included.
    pub fn to_document(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

// ============ Stored Record ============

/// A persisted lead with its storage-assigned metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadEntry {
    pub id: Uuid,
    #[serde(flatten)]
    pub lead: LeadRequest,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeadEntry {
    pub fn stage(&self) -> LeadStage {
        self.lead.stage()
    }
}

// ============ API Response ============

/// Response for both create and update of a lead.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadResponse {
    pub lead_stage: LeadStage,
    pub data_acquisition_link: Option<String>,
    pub appointment_booking_link: Option<String>,
    /// Set when a create found an existing record for the identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_data: Option<LeadEntry>,
}
