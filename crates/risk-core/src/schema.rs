//! Booking record schema and validation
//!
//! Raw records arrive as loose JSON mappings from the presentation layer.
//! The validator is the only way to obtain a [`ValidatedRecord`]; it checks
//! presence, type, categorical domain and numeric range for every field in
//! declared schema order. `validate` stops at the first violation in that
//! order, `collect_violations` reports all of them in the same order.

use crate::error::{ValidationError, ValidationReason};
use crate::models::{
    BookingRecord, CustomerType, DepositType, DistributionChannel, FieldValue, HotelType,
    LeadTimeCategory, MarketSegment, MealPlan, RoomType,
};
use serde_json::Value;

/// Loose field mapping as submitted by an adapter
pub type RawBooking = serde_json::Map<String, Value>;

/// Every field of a booking record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BookingField {
    Hotel,
    LeadTime,
    Meal,
    MarketSegment,
    DistributionChannel,
    IsRepeatedGuest,
    PreviousCancellations,
    PreviousBookingsNotCanceled,
    ReservedRoomType,
    AssignedRoomType,
    BookingChanges,
    DepositType,
    DaysInWaitingList,
    CustomerType,
    Adr,
    RequiredCarParkingSpaces,
    TotalOfSpecialRequests,
    TotalStays,
    TotalGuests,
    HasAgent,
    HasCompany,
    RoomAssignedDifferent,
    ArrivalMonthNum,
    LeadTimeCategory,
}

/// Type and domain of a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldSpec {
    Categorical(&'static [&'static str]),
    Flag,
    Integer { min: i64, max: i64 },
    Real { min: f64, max: f64 },
}

impl FieldSpec {
    pub fn is_categorical(&self) -> bool {
        matches!(self, FieldSpec::Categorical(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldSpec::Categorical(_) => "string",
            FieldSpec::Flag => "flag (0 or 1)",
            FieldSpec::Integer { .. } => "integer",
            FieldSpec::Real { .. } => "number",
        }
    }
}

impl BookingField {
    /// Declared schema order
    pub const ALL: [BookingField; 24] = [
        BookingField::Hotel,
        BookingField::LeadTime,
        BookingField::Meal,
        BookingField::MarketSegment,
        BookingField::DistributionChannel,
        BookingField::IsRepeatedGuest,
        BookingField::PreviousCancellations,
        BookingField::PreviousBookingsNotCanceled,
        BookingField::ReservedRoomType,
        BookingField::AssignedRoomType,
        BookingField::BookingChanges,
        BookingField::DepositType,
        BookingField::DaysInWaitingList,
        BookingField::CustomerType,
        BookingField::Adr,
        BookingField::RequiredCarParkingSpaces,
        BookingField::TotalOfSpecialRequests,
        BookingField::TotalStays,
        BookingField::TotalGuests,
        BookingField::HasAgent,
        BookingField::HasCompany,
        BookingField::RoomAssignedDifferent,
        BookingField::ArrivalMonthNum,
        BookingField::LeadTimeCategory,
    ];

    /// Wire name of the field
    pub fn name(&self) -> &'static str {
        match self {
            BookingField::Hotel => "hotel",
            BookingField::LeadTime => "lead_time",
            BookingField::Meal => "meal",
            BookingField::MarketSegment => "market_segment",
            BookingField::DistributionChannel => "distribution_channel",
            BookingField::IsRepeatedGuest => "is_repeated_guest",
            BookingField::PreviousCancellations => "previous_cancellations",
            BookingField::PreviousBookingsNotCanceled => "previous_bookings_not_canceled",
            BookingField::ReservedRoomType => "reserved_room_type",
            BookingField::AssignedRoomType => "assigned_room_type",
            BookingField::BookingChanges => "booking_changes",
            BookingField::DepositType => "deposit_type",
            BookingField::DaysInWaitingList => "days_in_waiting_list",
            BookingField::CustomerType => "customer_type",
            BookingField::Adr => "adr",
            BookingField::RequiredCarParkingSpaces => "required_car_parking_spaces",
            BookingField::TotalOfSpecialRequests => "total_of_special_requests",
            BookingField::TotalStays => "total_stays",
            BookingField::TotalGuests => "total_guests",
            BookingField::HasAgent => "has_agent",
            BookingField::HasCompany => "has_company",
            BookingField::RoomAssignedDifferent => "room_assigned_different",
            BookingField::ArrivalMonthNum => "arrival_month_num",
            BookingField::LeadTimeCategory => "lead_time_category",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        BookingField::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn spec(&self) -> FieldSpec {
        use FieldSpec::*;
        match self {
            BookingField::Hotel => Categorical(HotelType::LABELS),
            BookingField::LeadTime => Integer { min: 0, max: 365 },
            BookingField::Meal => Categorical(MealPlan::LABELS),
            BookingField::MarketSegment => Categorical(MarketSegment::LABELS),
            BookingField::DistributionChannel => Categorical(DistributionChannel::LABELS),
            BookingField::IsRepeatedGuest => Flag,
            BookingField::PreviousCancellations => Integer { min: 0, max: 20 },
            BookingField::PreviousBookingsNotCanceled => Integer { min: 0, max: 20 },
            BookingField::ReservedRoomType => Categorical(RoomType::LABELS),
            BookingField::AssignedRoomType => Categorical(RoomType::LABELS),
            BookingField::BookingChanges => Integer { min: 0, max: 10 },
            BookingField::DepositType => Categorical(DepositType::LABELS),
            BookingField::DaysInWaitingList => Integer { min: 0, max: 365 },
            BookingField::CustomerType => Categorical(CustomerType::LABELS),
            BookingField::Adr => Real { min: 0.0, max: 1000.0 },
            BookingField::RequiredCarParkingSpaces => Integer { min: 0, max: 5 },
            BookingField::TotalOfSpecialRequests => Integer { min: 0, max: 5 },
            BookingField::TotalStays => Integer { min: 1, max: 30 },
            BookingField::TotalGuests => Integer { min: 1, max: 10 },
            BookingField::HasAgent => Flag,
            BookingField::HasCompany => Flag,
            BookingField::RoomAssignedDifferent => Flag,
            BookingField::ArrivalMonthNum => Integer { min: 1, max: 12 },
            BookingField::LeadTimeCategory => Categorical(LeadTimeCategory::LABELS),
        }
    }

    /// Fields the encoder can derive when a record omits them
    pub fn is_derivable(&self) -> bool {
        matches!(
            self,
            BookingField::RoomAssignedDifferent | BookingField::LeadTimeCategory
        )
    }
}

/// A booking record that passed every schema check
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    record: BookingRecord,
}

impl ValidatedRecord {
    pub fn record(&self) -> &BookingRecord {
        &self.record
    }

    pub fn into_inner(self) -> BookingRecord {
        self.record
    }
}

/// Stateless validator for raw booking records
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a raw mapping, failing on the first violation in schema order
    pub fn validate(&self, raw: &RawBooking) -> Result<ValidatedRecord, ValidationError> {
        use BookingField as F;
        let record = BookingRecord {
            hotel: category(raw, F::Hotel, HotelType::parse)?,
            lead_time: integer(raw, F::LeadTime)?,
            meal: category(raw, F::Meal, MealPlan::parse)?,
            market_segment: category(raw, F::MarketSegment, MarketSegment::parse)?,
            distribution_channel: category(
                raw,
                F::DistributionChannel,
                DistributionChannel::parse,
            )?,
            is_repeated_guest: flag(raw, F::IsRepeatedGuest)?,
            previous_cancellations: integer(raw, F::PreviousCancellations)?,
            previous_bookings_not_canceled: integer(raw, F::PreviousBookingsNotCanceled)?,
            reserved_room_type: category(raw, F::ReservedRoomType, RoomType::parse)?,
            assigned_room_type: category(raw, F::AssignedRoomType, RoomType::parse)?,
            booking_changes: integer(raw, F::BookingChanges)?,
            deposit_type: category(raw, F::DepositType, DepositType::parse)?,
            days_in_waiting_list: integer(raw, F::DaysInWaitingList)?,
            customer_type: category(raw, F::CustomerType, CustomerType::parse)?,
            adr: real(raw, F::Adr)?,
            required_car_parking_spaces: integer(raw, F::RequiredCarParkingSpaces)?,
            total_of_special_requests: integer(raw, F::TotalOfSpecialRequests)?,
            total_stays: integer(raw, F::TotalStays)?,
            total_guests: integer(raw, F::TotalGuests)?,
            has_agent: flag(raw, F::HasAgent)?,
            has_company: flag(raw, F::HasCompany)?,
            room_assigned_different: optional(raw, F::RoomAssignedDifferent, flag)?,
            arrival_month_num: integer(raw, F::ArrivalMonthNum)?,
            lead_time_category: optional(raw, F::LeadTimeCategory, |raw, f| {
                category(raw, f, LeadTimeCategory::parse)
            })?,
        };

        if let Some(unknown) = unexpected_fields(raw).next() {
            return Err(ValidationError::new(unknown, ValidationReason::Unexpected));
        }

        Ok(ValidatedRecord { record })
    }

    /// Re-validate a typed record built by an adapter
    pub fn validate_record(&self, record: &BookingRecord) -> Result<ValidatedRecord, ValidationError> {
        // JSON has no NaN or infinity; `to_raw` would turn them into null.
        self.validate(&record.to_raw()).map_err(|err| {
            if err.field == BookingField::Adr.name() && !record.adr.is_finite() {
                non_finite_adr(record.adr)
            } else {
                err
            }
        })
    }

    /// Every violation in the record, in schema order, unknown fields last
    pub fn collect_violations(&self, raw: &RawBooking) -> Vec<ValidationError> {
        let mut violations: Vec<ValidationError> = BookingField::ALL
            .iter()
            .filter_map(|field| check_field(*field, raw.get(field.name())).err())
            .collect();
        violations.extend(
            unexpected_fields(raw).map(|name| ValidationError::new(name, ValidationReason::Unexpected)),
        );
        violations
    }
}

fn non_finite_adr(value: f64) -> ValidationError {
    let reason = match BookingField::Adr.spec() {
        FieldSpec::Real { min, max } if !value.is_nan() => {
            ValidationReason::OutOfRange { value, min, max }
        }
        spec => ValidationReason::WrongType {
            expected: spec.type_name(),
        },
    };
    ValidationError::new(BookingField::Adr.name(), reason)
}

/// Check one field against its spec. `Ok(None)` means an omitted derivable field.
pub fn check_field(
    field: BookingField,
    value: Option<&Value>,
) -> Result<Option<FieldValue>, ValidationError> {
    let fail = |reason| ValidationError::new(field.name(), reason);

    let value = match value {
        None | Some(Value::Null) if field.is_derivable() => return Ok(None),
        None | Some(Value::Null) => return Err(fail(ValidationReason::Missing)),
        Some(v) => v,
    };
    let spec = field.spec();
    let wrong_type = || fail(ValidationReason::WrongType { expected: spec.type_name() });

    let checked = match spec {
        FieldSpec::Categorical(domain) => {
            let label = value.as_str().ok_or_else(wrong_type)?;
            let known = domain.iter().copied().find(|d| *d == label).ok_or_else(|| {
                fail(ValidationReason::NotInDomain {
                    value: label.to_string(),
                    allowed: domain,
                })
            })?;
            FieldValue::Category(known)
        }
        FieldSpec::Flag => match value {
            Value::Bool(b) => FieldValue::Flag(*b),
            Value::Number(_) => match integral(value) {
                Some(0) => FieldValue::Flag(false),
                Some(1) => FieldValue::Flag(true),
                _ => {
                    return Err(fail(ValidationReason::NotInDomain {
                        value: value.to_string(),
                        allowed: &["0", "1"],
                    }))
                }
            },
            _ => return Err(wrong_type()),
        },
        FieldSpec::Integer { min, max } => {
            let n = integral(value).ok_or_else(wrong_type)?;
            if n < min || n > max {
                return Err(fail(ValidationReason::OutOfRange {
                    value: n as f64,
                    min: min as f64,
                    max: max as f64,
                }));
            }
            FieldValue::Integer(n)
        }
        FieldSpec::Real { min, max } => {
            let x = value.as_f64().filter(|x| x.is_finite()).ok_or_else(wrong_type)?;
            if x < min || x > max {
                return Err(fail(ValidationReason::OutOfRange { value: x, min, max }));
            }
            FieldValue::Real(x)
        }
    };
    Ok(Some(checked))
}

/// Integer view of a JSON number, accepting integral floats such as `30.0`
fn integral(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let x = value.as_f64()?;
    (x.is_finite() && x.fract() == 0.0 && x.abs() < i64::MAX as f64).then_some(x as i64)
}

fn unexpected_fields(raw: &RawBooking) -> impl Iterator<Item = &str> {
    raw.keys()
        .map(String::as_str)
        .filter(|name| BookingField::from_name(name).is_none())
}

fn required(raw: &RawBooking, field: BookingField) -> Result<FieldValue, ValidationError> {
    check_field(field, raw.get(field.name()))?
        .ok_or_else(|| ValidationError::new(field.name(), ValidationReason::Missing))
}

fn category<T>(
    raw: &RawBooking,
    field: BookingField,
    parse: fn(&str) -> Option<T>,
) -> Result<T, ValidationError> {
    let value = required(raw, field)?;
    value.as_category().and_then(parse).ok_or_else(|| {
        ValidationError::new(field.name(), ValidationReason::WrongType { expected: "string" })
    })
}

fn integer(raw: &RawBooking, field: BookingField) -> Result<u32, ValidationError> {
    match required(raw, field)? {
        FieldValue::Integer(n) => u32::try_from(n).map_err(|_| {
            ValidationError::new(
                field.name(),
                ValidationReason::OutOfRange {
                    value: n as f64,
                    min: 0.0,
                    max: u32::MAX as f64,
                },
            )
        }),
        _ => Err(ValidationError::new(
            field.name(),
            ValidationReason::WrongType { expected: "integer" },
        )),
    }
}

fn flag(raw: &RawBooking, field: BookingField) -> Result<bool, ValidationError> {
    match required(raw, field)? {
        FieldValue::Flag(b) => Ok(b),
        _ => Err(ValidationError::new(
            field.name(),
            ValidationReason::WrongType { expected: "flag (0 or 1)" },
        )),
    }
}

fn real(raw: &RawBooking, field: BookingField) -> Result<f64, ValidationError> {
    required(raw, field)?.as_number().ok_or_else(|| {
        ValidationError::new(field.name(), ValidationReason::WrongType { expected: "number" })
    })
}

fn optional<T>(
    raw: &RawBooking,
    field: BookingField,
    read: impl Fn(&RawBooking, BookingField) -> Result<T, ValidationError>,
) -> Result<Option<T>, ValidationError> {
    match raw.get(field.name()) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => read(raw, field).map(Some),
    }
}

/// Mid-range booking used for the artifact self-check at load time
pub(crate) fn reference_record() -> ValidatedRecord {
    ValidatedRecord {
        record: BookingRecord {
            hotel: HotelType::City,
            lead_time: 60,
            meal: MealPlan::BedAndBreakfast,
            market_segment: MarketSegment::OnlineTa,
            distribution_channel: DistributionChannel::TaTo,
            is_repeated_guest: false,
            previous_cancellations: 0,
            previous_bookings_not_canceled: 0,
            reserved_room_type: RoomType::A,
            assigned_room_type: RoomType::A,
            booking_changes: 0,
            deposit_type: DepositType::NoDeposit,
            days_in_waiting_list: 0,
            customer_type: CustomerType::Transient,
            adr: 100.0,
            required_car_parking_spaces: 0,
            total_of_special_requests: 1,
            total_stays: 3,
            total_guests: 2,
            has_agent: true,
            has_company: false,
            room_assigned_different: None,
            arrival_month_num: 6,
            lead_time_category: None,
        },
    }
}
