//! Timezone emulation: zone tables, daylight boundary search, script output

pub mod dst;
pub mod script;
pub mod zones;


pub use dst::{find_dst_bounds, Boundary, DstBounds, ZoneRules};
pub use script::{generate_script, TimezoneDescriptor, TimezoneScripts};
