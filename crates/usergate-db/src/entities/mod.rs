//! Database entities

pub mod role;
pub mod user;

pub use role::Entity as Role;
pub use user::Entity as User;

pub mod prelude {
    pub use super::role::Entity as Role;
    pub use super::user::Entity as User;
}
