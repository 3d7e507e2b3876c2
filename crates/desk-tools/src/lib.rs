pub mod booking;
pub mod retrieve;
pub mod store;

use desk_core::retrieval::VectorIndex;
use desk_core::tool_registry::ToolRegistry;
use std::sync::Arc;
use store::BookingStore;

/// Register the retrieval agent's tool set.
pub fn register_rag_tools(registry: &mut ToolRegistry, index: Arc<VectorIndex>) {
    registry.register(Arc::new(retrieve::RetrieverTool::new(index)));
}

/// Register the booking agent's tool set.
pub fn register_booking_tools(registry: &mut ToolRegistry, store: Arc<BookingStore>) {
    registry.register(Arc::new(booking::GetCurrentDateTool));
    registry.register(Arc::new(booking::ListAvailableClassesTool::new(
        store.clone(),
    )));
    registry.register(Arc::new(booking::CheckAvailabilityTool::new(store.clone())));
    registry.register(Arc::new(booking::BookClassTool::new(store.clone())));
    registry.register(Arc::new(booking::CancelBookingTool::new(store)));
}
