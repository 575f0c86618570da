mod planner;
mod step;
mod tracker;

pub use planner::{DefaultRoutePlanner, RoutePlanner};
pub use step::{BasicRouteDirector, RouteStep};
pub use tracker::RouteTracker;
