mod associations;
mod ingredients;
mod recipes;
mod shopping_list;
mod subscriptions;
mod tags;
mod users;

pub use associations::*;
pub use ingredients::*;
pub use recipes::*;
pub use shopping_list::*;
pub use subscriptions::*;
pub use tags::*;
pub use users::*;
