//! Domain types for the departure aggregation engine.
//!
//! Configuration types are immutable after load; view types are rebuilt on
//! every poll cycle and shared with viewers behind `Arc`.

mod departure;
mod route;
mod station;
mod stop;
mod view;

pub use departure::RawDeparture;
pub use route::{DisplayOptions, RouteConfiguration};
pub use station::{InvalidStationId, StationId};
pub use stop::{
    DEFAULT_MAX_DEPARTURES_PER_ROUTE, DEFAULT_MAX_DEPARTURES_PER_STOP, DEFAULT_UNGROUPED_TITLE,
    DirectionMapping, Pattern, StopConfiguration,
};
pub use view::{
    ApiStatus, DirectionGroup, FetchStatus, GroupView, PaginationInfo, RouteViewModel, StopView,
};

pub(crate) use stop::normalize;
