pub use bevy::prelude::{
    App, Deref, DerefMut, Event, EventReader, EventWriter, IntoSystemConfigs,
    IntoSystemSetConfigs, Plugin, Res, ResMut, Resource, SystemSet, Update,
};

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::configuration::CoreConfiguration;
pub use crate::events::{GameEvent, GameEventSink, NullSink};
pub use crate::grid::{Direction, Grid};
pub use crate::CoreError;
