//! Core data models for booking cancellation risk

use crate::schema::BookingField;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a categorical booking attribute with a fixed wire-label domain.
macro_rules! categorical {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $label)] $variant,)+
        }

        impl $name {
            /// Wire labels of the domain, in declaration order
            pub const LABELS: &'static [&'static str] = &[$($label),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            pub fn parse(label: &str) -> Option<Self> {
                match label {
                    $($label => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

categorical!(
    /// Property type of the booked hotel
    HotelType {
        City => "City Hotel",
        Resort => "Resort Hotel",
    }
);

categorical!(
    /// Board basis
    MealPlan {
        BedAndBreakfast => "BB",
        HalfBoard => "HB",
        FullBoard => "FB",
        SelfCatering => "SC",
    }
);

categorical!(
    MarketSegment {
        OnlineTa => "Online TA",
        OfflineTaTo => "Offline TA/TO",
        Direct => "Direct",
        Groups => "Groups",
        Corporate => "Corporate",
        Complementary => "Complementary",
        Aviation => "Aviation",
    }
);

categorical!(
    DistributionChannel {
        TaTo => "TA/TO",
        Direct => "Direct",
        Corporate => "Corporate",
        Gds => "GDS",
    }
);

categorical!(
    /// Room type code, used for both reserved and assigned rooms
    RoomType {
        A => "A",
        B => "B",
        C => "C",
        D => "D",
        E => "E",
        F => "F",
        G => "G",
    }
);

categorical!(
    DepositType {
        NoDeposit => "No Deposit",
        NonRefund => "Non Refund",
        Refundable => "Refundable",
    }
);

categorical!(
    CustomerType {
        Transient => "Transient",
        TransientParty => "Transient-Party",
        Contract => "Contract",
        Group => "Group",
    }
);

categorical!(
    /// Coarse bucket of the booking lead time
    LeadTimeCategory {
        LastMinute => "last_minute",
        Short => "short",
        Medium => "medium",
        Long => "long",
    }
);

impl LeadTimeCategory {
    /// Bucket a lead time in days: up to a week is last minute, up to a
    /// month short, up to a quarter medium, anything later long.
    pub fn from_lead_time(days: u32) -> Self {
        match days {
            0..=7 => LeadTimeCategory::LastMinute,
            8..=30 => LeadTimeCategory::Short,
            31..=90 => LeadTimeCategory::Medium,
            _ => LeadTimeCategory::Long,
        }
    }
}

/// A single booking submitted for risk assessment.
///
/// `room_assigned_different` and `lead_time_category` may be omitted; the
/// feature encoder derives them from the room types and the lead time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub hotel: HotelType,
    pub lead_time: u32,
    pub meal: MealPlan,
    pub market_segment: MarketSegment,
    pub distribution_channel: DistributionChannel,
    #[serde(with = "flag")]
    pub is_repeated_guest: bool,
    pub previous_cancellations: u32,
    pub previous_bookings_not_canceled: u32,
    pub reserved_room_type: RoomType,
    pub assigned_room_type: RoomType,
    pub booking_changes: u32,
    pub deposit_type: DepositType,
    pub days_in_waiting_list: u32,
    pub customer_type: CustomerType,
    pub adr: f64,
    pub required_car_parking_spaces: u32,
    pub total_of_special_requests: u32,
    pub total_stays: u32,
    pub total_guests: u32,
    #[serde(with = "flag")]
    pub has_agent: bool,
    #[serde(with = "flag")]
    pub has_company: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "optional_flag")]
    pub room_assigned_different: Option<bool>,
    pub arrival_month_num: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_time_category: Option<LeadTimeCategory>,
}

impl BookingRecord {
    /// Value supplied for a field, or `None` when a derivable field was omitted
    pub fn value(&self, field: BookingField) -> Option<FieldValue> {
        use BookingField as F;
        let value = match field {
            F::Hotel => FieldValue::Category(self.hotel.as_str()),
            F::LeadTime => FieldValue::Integer(self.lead_time.into()),
            F::Meal => FieldValue::Category(self.meal.as_str()),
            F::MarketSegment => FieldValue::Category(self.market_segment.as_str()),
            F::DistributionChannel => FieldValue::Category(self.distribution_channel.as_str()),
            F::IsRepeatedGuest => FieldValue::Flag(self.is_repeated_guest),
            F::PreviousCancellations => FieldValue::Integer(self.previous_cancellations.into()),
            F::PreviousBookingsNotCanceled => {
                FieldValue::Integer(self.previous_bookings_not_canceled.into())
            }
            F::ReservedRoomType => FieldValue::Category(self.reserved_room_type.as_str()),
            F::AssignedRoomType => FieldValue::Category(self.assigned_room_type.as_str()),
            F::BookingChanges => FieldValue::Integer(self.booking_changes.into()),
            F::DepositType => FieldValue::Category(self.deposit_type.as_str()),
            F::DaysInWaitingList => FieldValue::Integer(self.days_in_waiting_list.into()),
            F::CustomerType => FieldValue::Category(self.customer_type.as_str()),
            F::Adr => FieldValue::Real(self.adr),
            F::RequiredCarParkingSpaces => {
                FieldValue::Integer(self.required_car_parking_spaces.into())
            }
            F::TotalOfSpecialRequests => FieldValue::Integer(self.total_of_special_requests.into()),
            F::TotalStays => FieldValue::Integer(self.total_stays.into()),
            F::TotalGuests => FieldValue::Integer(self.total_guests.into()),
            F::HasAgent => FieldValue::Flag(self.has_agent),
            F::HasCompany => FieldValue::Flag(self.has_company),
            F::RoomAssignedDifferent => FieldValue::Flag(self.room_assigned_different?),
            F::ArrivalMonthNum => FieldValue::Integer(self.arrival_month_num.into()),
            F::LeadTimeCategory => FieldValue::Category(self.lead_time_category?.as_str()),
        };
        Some(value)
    }

    /// Loose field mapping in wire format, the shape adapters submit
    pub fn to_raw(&self) -> serde_json::Map<String, serde_json::Value> {
        BookingField::ALL
            .iter()
            .filter_map(|field| {
                self.value(*field)
                    .map(|value| (field.name().to_string(), value.to_json()))
            })
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(u64),
}

impl FlagRepr {
    fn into_bool<E: serde::de::Error>(self) -> Result<bool, E> {
        match self {
            FlagRepr::Bool(flag) => Ok(flag),
            FlagRepr::Int(0) => Ok(false),
            FlagRepr::Int(1) => Ok(true),
            FlagRepr::Int(n) => Err(E::custom(format!("flag must be 0 or 1, got {}", n))),
        }
    }
}

/// Flags travel as `0|1`; `true|false` is accepted on input
mod flag {
    use super::FlagRepr;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        FlagRepr::deserialize(deserializer)?.into_bool()
    }
}

mod optional_flag {
    use super::FlagRepr;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(flag) => serializer.serialize_some(&u8::from(*flag)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<bool>, D::Error> {
        Option::<FlagRepr>::deserialize(deserializer)?
            .map(FlagRepr::into_bool)
            .transpose()
    }
}

/// A typed field value as checked by the schema validator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Category(&'static str),
    Flag(bool),
    Integer(i64),
    Real(f64),
}

impl FieldValue {
    /// Numeric view of the value; flags map to 0 and 1, categories have none
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Category(_) => None,
            FieldValue::Flag(flag) => Some(if *flag { 1.0 } else { 0.0 }),
            FieldValue::Integer(n) => Some(*n as f64),
            FieldValue::Real(x) => Some(*x),
        }
    }

    pub fn as_category(&self) -> Option<&'static str> {
        match self {
            FieldValue::Category(label) => Some(label),
            _ => None,
        }
    }

    fn to_json(self) -> serde_json::Value {
        match self {
            FieldValue::Category(label) => serde_json::Value::from(label),
            FieldValue::Flag(flag) => serde_json::Value::from(u8::from(flag)),
            FieldValue::Integer(n) => serde_json::Value::from(n),
            FieldValue::Real(x) => serde_json::Value::from(x),
        }
    }
}

/// Encoded model input, ordered exactly as the artifact's manifest declares
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Box<[f32]>,
}

impl FeatureVector {
    /// Wrap pre-encoded values; callers own the ordering contract
    pub fn from_values(values: Vec<f32>) -> Self {
        Self {
            values: values.into_boxed_slice(),
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Raw classifier output before any decision policy is applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawScore {
    /// Discrete label emitted by the model, when the artifact has one
    pub label: Option<bool>,
    /// Probability of the positive (cancelled) class
    pub probability: f64,
}

/// Binary risk verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationLabel {
    Cancelled,
    NotCancelled,
}

impl CancellationLabel {
    pub fn from_cancelled(cancelled: bool) -> Self {
        if cancelled {
            CancellationLabel::Cancelled
        } else {
            CancellationLabel::NotCancelled
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CancellationLabel::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationLabel::Cancelled => "cancelled",
            CancellationLabel::NotCancelled => "not_cancelled",
        }
    }

    /// One-line verdict suitable for end users
    pub fn summary(&self) -> &'static str {
        match self {
            CancellationLabel::Cancelled => "High risk: booking likely to be cancelled",
            CancellationLabel::NotCancelled => "Low risk: booking likely to be honored",
        }
    }
}

impl fmt::Display for CancellationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rule produced the label of a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivePolicy {
    /// The artifact's own discrete label was used
    ModelLabel,
    /// `probability >= threshold` decided the label
    Threshold,
}

impl ActivePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivePolicy::ModelLabel => "model_label",
            ActivePolicy::Threshold => "threshold",
        }
    }
}

/// Complete outcome of one risk assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub probability: f64,
    pub complement: f64,
    pub label: CancellationLabel,
    pub policy: ActivePolicy,
    pub threshold: f64,
    pub model_version: String,
    pub generated_at: i64,
}
