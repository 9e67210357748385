pub mod connectivity;
pub mod planar_graph;


pub use connectivity::{ConnectivityGraph, GapCloser, GapClosing};
pub use planar_graph::PlanarGraph;
