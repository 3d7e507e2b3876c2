use crate::store::{BookingStore, ClassRow};
use async_trait::async_trait;
use chrono::Local;
use desk_core::error::DeskError;
use desk_core::tool_registry::Tool;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

fn invalid_args(tool_name: &str, e: impl std::fmt::Display) -> DeskError {
    DeskError::ToolExecution {
        tool_name: tool_name.into(),
        message: format!("Invalid arguments: {}", e),
    }
}

/// Gets the current date in the booking system's format.
pub struct GetCurrentDateTool;

#[async_trait]
impl Tool for GetCurrentDateTool {
    fn name(&self) -> &str {
        "get_current_date"
    }

    fn description(&self) -> &str {
        "Get the current date in the format the booking system expects (YYYY-MM-DD). \
         Call this before any date reasoning; never guess the date."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value) -> Result<String, DeskError> {
        Ok(Local::now().format("%Y-%m-%d").to_string())
    }
}

/// List all classes scheduled on a date.
pub struct ListAvailableClassesTool {
    store: Arc<BookingStore>,
}

impl ListAvailableClassesTool {
    pub fn new(store: Arc<BookingStore>) -> Self {
        Self { store }
    }
}

pub(crate) fn format_class_list(rows: &[ClassRow], date: &str) -> String {
    if rows.is_empty() {
        return format!("No classes available on {}.", date);
    }
    rows.iter()
        .map(|cls| {
            let spots = cls
                .spots_available
                .map(|n| n.to_string())
                .unwrap_or_else(|| "N/A".into());
            format!(
                "{} - {} ({} spots available)",
                cls.class_name, cls.class_date, spots
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Tool for ListAvailableClassesTool {
    fn name(&self) -> &str {
        "list_available_classes"
    }

    fn description(&self) -> &str {
        "List all classes available on a specific date."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "date": {
                    "type": "string",
                    "description": "Date in format YYYY-MM-DD"
                }
            },
            "required": ["date"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, DeskError> {
        #[derive(Deserialize)]
        struct Args {
            date: String,
        }
        let args: Args =
            serde_json::from_value(args).map_err(|e| invalid_args(self.name(), e))?;

        let rows = self.store.classes_on(&args.date).await?;
        Ok(format_class_list(&rows, &args.date))
    }
}

/// Check whether a specific class has open spots.
pub struct CheckAvailabilityTool {
    store: Arc<BookingStore>,
}

impl CheckAvailabilityTool {
    pub fn new(store: Arc<BookingStore>) -> Self {
        Self { store }
    }
}

pub(crate) fn format_availability(row: Option<&ClassRow>, class_name: &str, date: &str) -> String {
    match row {
        None => format!("{} with the date {} does not exist", class_name, date),
        Some(cls) => {
            let spots = cls
                .spots_available
                .map(|n| n.to_string())
                .unwrap_or_else(|| "N/A".into());
            format!(
                "Class '{}' on {} has {} spots available.",
                cls.class_name, cls.class_date, spots
            )
        }
    }
}

#[async_trait]
impl Tool for CheckAvailabilityTool {
    fn name(&self) -> &str {
        "check_availability"
    }

    fn description(&self) -> &str {
        "Check if a class has available spots on a date."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "class_name": {
                    "type": "string",
                    "description": "Name of the class (e.g., \"Yoga\", \"Strength\")"
                },
                "date": {
                    "type": "string",
                    "description": "Date in format YYYY-MM-DD"
                }
            },
            "required": ["class_name", "date"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, DeskError> {
        #[derive(Deserialize)]
        struct Args {
            class_name: String,
            date: String,
        }
        let args: Args =
            serde_json::from_value(args).map_err(|e| invalid_args(self.name(), e))?;

        let class_name = args.class_name.to_lowercase();
        let row = self.store.find_class_on(&class_name, &args.date).await?;
        Ok(format_availability(row.as_ref(), &class_name, &args.date))
    }
}

/// Book a class for a member.
pub struct BookClassTool {
    store: Arc<BookingStore>,
}

impl BookClassTool {
    pub fn new(store: Arc<BookingStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for BookClassTool {
    fn name(&self) -> &str {
        "book_class"
    }

    fn description(&self) -> &str {
        "Book a class for a member. Requires the member's ID, the class name, \
         and the date in format YYYY-MM-DD."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "member_id": {
                    "type": "string",
                    "description": "Member's ID"
                },
                "class_name": {
                    "type": "string",
                    "description": "Name of the class to book"
                },
                "date": {
                    "type": "string",
                    "description": "Date in format YYYY-MM-DD"
                }
            },
            "required": ["member_id", "class_name", "date"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, DeskError> {
        #[derive(Deserialize)]
        struct Args {
            member_id: String,
            class_name: String,
            date: String,
        }
        let args: Args =
            serde_json::from_value(args).map_err(|e| invalid_args(self.name(), e))?;

        let class_name = args.class_name.to_lowercase();

        let Some(member) = self.store.find_member(&args.member_id).await? else {
            return Ok(format!("Member ID {} not found.", args.member_id));
        };
        let Some(class) = self.store.find_class(&class_name).await? else {
            return Ok(format!("Class '{}' not found.", class_name));
        };

        let booking = self.store.insert_booking(member.id, class.id).await?;
        Ok(format!(
            "Successfully booked '{}' on {} for member {}. Confirmation ID: {}",
            class_name, args.date, args.member_id, booking.booking_id
        ))
    }
}

/// Cancel an existing booking. Confirmation is the agent's responsibility;
/// by the time this tool runs the user has already said yes.
pub struct CancelBookingTool {
    store: Arc<BookingStore>,
}

impl CancelBookingTool {
    pub fn new(store: Arc<BookingStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CancelBookingTool {
    fn name(&self) -> &str {
        "cancel_booking"
    }

    fn description(&self) -> &str {
        "Cancel an existing booking. Requires the booking's confirmation ID and \
         the member's ID. Only call this after the user has explicitly confirmed."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "booking_id": {
                    "type": "string",
                    "description": "The booking's confirmation ID"
                },
                "member_id": {
                    "type": "string",
                    "description": "Member's ID"
                }
            },
            "required": ["booking_id", "member_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, DeskError> {
        #[derive(Deserialize)]
        struct Args {
            booking_id: String,
            member_id: String,
        }
        let args: Args =
            serde_json::from_value(args).map_err(|e| invalid_args(self.name(), e))?;

        let Some(member) = self.store.find_member(&args.member_id).await? else {
            return Ok(format!("Member ID {} not found.", args.member_id));
        };
        let Some(booking) = self.store.find_booking(&args.booking_id, member.id).await? else {
            return Ok("Booking not found, please try again!".to_string());
        };

        self.store.delete_booking(booking.id).await?;
        Ok(format!(
            "Successfully cancelled booking {} for member {}.",
            args.booking_id, args.member_id
        ))
    }
}
