use axum::Router;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::openapi::server::Server;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::TOKEN_HEADER;
use crate::{models, routes};

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::auth::register,
		routes::auth::login,
		routes::auth::me,
		routes::auth::logout,
		routes::advertisements::list_advertisements,
		routes::advertisements::create_advertisement,
		routes::advertisements::get_advertisement,
		routes::advertisements::update_advertisement,
		routes::advertisements::delete_advertisement,
		routes::users::get_user,
		routes::users::update_user,
		routes::users::delete_user,
		routes::rbac::list_roles,
		routes::rbac::create_role,
		routes::rbac::get_role,
		routes::rbac::delete_role,
		routes::rbac::get_role_rights,
		routes::rbac::attach_right_to_role,
		routes::rbac::detach_right_from_role,
		routes::rbac::list_rights,
		routes::rbac::create_right,
		routes::rbac::get_user_roles,
		routes::rbac::assign_role_to_user,
		routes::rbac::revoke_role_from_user,
		routes::rbac::get_effective_rights
	),
	components(
		schemas(
			models::user::User,
			models::user::RegisterRequest,
			models::user::LoginRequest,
			models::user::LoginResponse,
			models::user::UserUpdateRequest,
			models::advertisement::Advertisement,
			models::advertisement::AdvertisementCreateRequest,
			models::advertisement::AdvertisementUpdateRequest,
			models::rbac::ResourceKind,
			models::rbac::Action,
			models::rbac::Role,
			models::rbac::RoleCreateRequest,
			models::rbac::RoleWithRights,
			models::rbac::Right,
			models::rbac::RightCreateRequest,
			models::rbac::RoleRight,
			models::rbac::AttachRightRequest,
			models::rbac::UserRole,
			models::rbac::AssignRoleRequest,
			models::rbac::EffectiveRights,
			routes::MessageResponse,
			routes::health::HealthResponse
		)
	),
	modifiers(&TokenSecurity),
	tags(
		(name = "Health", description = "Service health"),
		(name = "Auth", description = "Registration and token login"),
		(name = "Advertisements", description = "Classified listings"),
		(name = "Users", description = "User accounts"),
		(name = "RBAC", description = "Roles, rights and assignments")
	)
)]
pub struct ApiDoc;

struct TokenSecurity;

impl Modify for TokenSecurity {
	fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
		if let Some(components) = openapi.components.as_mut() {
			components.add_security_scheme(
				"tokenAuth",
				SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(TOKEN_HEADER))),
			);
		}
	}
}

pub fn build_openapi(port: u16) -> utoipa::openapi::OpenApi {
	let mut doc = ApiDoc::openapi();
	doc.servers = Some(vec![Server::new(format!("http://localhost:{port}"))]);
	doc
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> Router {
	Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", doc))
}
