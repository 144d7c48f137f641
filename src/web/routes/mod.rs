pub mod admin_routes;
pub mod item_routes;
pub mod tag_routes;
pub mod user_routes;
