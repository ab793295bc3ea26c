use std::collections::BTreeMap;

use actix_files::{Files, NamedFile};
use actix_identity::Identity;
use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm, MultipartFormConfig};
use actix_web::{
    delete, get, post,
    web::{self, Data},
    HttpMessage, HttpRequest, HttpResponse, Responder,
};
use serde::{Deserialize, Serialize};
use tera::Context;

use crate::{
    auth::CurrentUser,
    db,
    errors::AppError,
    filter::{self, FilterCriteria, SearchParams},
    pinning::PendingImage,
    service,
    structs::{
        currency_symbol, Availability, Hostel, HostelInput, ImageCategory, AMENITIES, CURRENCIES,
        DEFAULT_CURRENCY, MAX_IMAGES_PER_CATEGORY,
    },
    AppState, TEMPLATES,
};

const FEATURED_COUNT: usize = 6;
const UPLOAD_TOTAL_LIMIT: usize = 40 * 1024 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(MultipartFormConfig::default().total_limit(UPLOAD_TOTAL_LIMIT))
        .service(Files::new("/static", "static"))
        .service(favicon_handler)
        .service(index_handler)
        .service(search_handler)
        .service(hostel_detail_handler)
        .service(list_hostel_handler)
        .service(create_hostel_handler)
        .service(edit_hostel_handler)
        .service(update_hostel_handler)
        .service(delete_hostel_handler)
        .service(save_hostel_handler)
        .service(unsave_hostel_handler)
        .service(saved_hostels_handler)
        .service(owner_dashboard_handler)
        .service(auth_page_handler)
        .service(session_handler)
        .service(logout_handler)
        .service(api_hostels_handler)
        .service(api_hostel_handler)
        .service(api_delete_hostel_handler)
        .service(api_owner_hostels_handler)
        .service(api_owner_analytics_handler);
}

/// A hostel as cards and the JSON API present it.
#[derive(Serialize)]
pub struct HostelView<'a> {
    #[serde(flatten)]
    hostel: &'a Hostel,
    price: f64,
    image: &'a str,
    currency_symbol: &'static str,
}

impl<'a> From<&'a Hostel> for HostelView<'a> {
    fn from(hostel: &'a Hostel) -> Self {
        HostelView {
            hostel,
            price: hostel.price(),
            image: hostel.image(),
            currency_symbol: currency_symbol(&hostel.currency),
        }
    }
}

fn views(hostels: &[Hostel]) -> Vec<HostelView<'_>> {
    hostels.iter().map(HostelView::from).collect()
}

/// Detail payload with images grouped by category.
#[derive(Serialize)]
pub struct HostelDetail<'a> {
    #[serde(flatten)]
    view: HostelView<'a>,
    gallery: BTreeMap<&'static str, Vec<&'a str>>,
}

impl<'a> From<&'a Hostel> for HostelDetail<'a> {
    fn from(hostel: &'a Hostel) -> Self {
        let gallery = ImageCategory::ALL
            .iter()
            .map(|category| (category.as_str(), hostel.images_of(*category)))
            .collect();
        HostelDetail {
            view: HostelView::from(hostel),
            gallery,
        }
    }
}

#[derive(Serialize)]
struct Choice<'a> {
    value: &'a str,
    checked: bool,
}

fn page_context(title: &str, description: &str, user: Option<&CurrentUser>) -> Context {
    let mut context = Context::new();
    context.insert("title", title);
    context.insert("description", description);
    context.insert("version", env!("CARGO_PKG_VERSION"));
    context.insert("signed_in", &user.is_some());
    context
}

fn render(template: &str, context: &Context) -> Result<HttpResponse, AppError> {
    let rendered = TEMPLATES.render(template, context).map_err(|e| {
        log::error!("Failed to render template: {}", e);
        AppError::TemplateError(e)
    })?;

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(rendered))
}

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header(("Location", location))
        .finish()
}

/// Redirect for pages that need a signed-in user.
fn sign_in_redirect() -> HttpResponse {
    see_other("/auth")
}

async fn filtered_hostels(
    state: &AppState,
    pairs: Vec<(String, String)>,
) -> Result<(SearchParams, Vec<Hostel>), AppError> {
    let params = SearchParams::from_pairs(pairs)?;
    let criteria = FilterCriteria::try_from(params.clone())?;
    let hostels = db::get_all_hostels(&state.db_pool).await.map_err(|e| {
        log::error!("Failed to get hostels: {}", e);
        AppError::DatabaseError(e)
    })?;
    Ok((params, filter::apply(&hostels, &criteria)))
}

#[get("/favicon")]
pub async fn favicon_handler() -> Result<impl Responder, AppError> {
    Ok(NamedFile::open("static/favicon.svg")?)
}

#[get("/")]
pub async fn index_handler(
    state: Data<AppState>,
    user: Option<CurrentUser>,
) -> Result<impl Responder, AppError> {
    let hostels = db::get_all_hostels(&state.db_pool).await.map_err(|e| {
        log::error!("Failed to get hostels: {}", e);
        AppError::DatabaseError(e)
    })?;
    let featured = &hostels[..hostels.len().min(FEATURED_COUNT)];

    let mut context = page_context(
        "Find your next hostel",
        "Affordable hostels with the amenities you need",
        user.as_ref(),
    );
    context.insert("hostels", &views(featured));
    render("index.html", &context)
}

#[get("/search")]
pub async fn search_handler(
    state: Data<AppState>,
    query: web::Query<Vec<(String, String)>>,
    user: Option<CurrentUser>,
) -> Result<impl Responder, AppError> {
    let (params, results) = filtered_hostels(&state, query.into_inner()).await?;
    let criteria = FilterCriteria::try_from(params.clone())?;

    let amenity_choices: Vec<Choice> = AMENITIES
        .iter()
        .map(|amenity| Choice {
            value: amenity,
            checked: criteria.amenities.contains(*amenity),
        })
        .collect();
    let availability_choices: Vec<Choice> = Availability::ALL
        .iter()
        .map(|status| Choice {
            value: status.as_str(),
            checked: criteria.availability.contains(status),
        })
        .collect();

    let mut context = page_context("Search", "Search hostels", user.as_ref());
    context.insert("params", &params);
    context.insert("hostels", &views(&results));
    context.insert("amenity_choices", &amenity_choices);
    context.insert("availability_choices", &availability_choices);
    render("search.html", &context)
}

#[get("/hostel/{id}")]
pub async fn hostel_detail_handler(
    state: Data<AppState>,
    path: web::Path<String>,
    user: Option<CurrentUser>,
) -> Result<impl Responder, AppError> {
    let id = path.into_inner();
    let hostel = db::get_hostel_by_id(&state.db_pool, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    let (is_owner, is_saved) = match &user {
        Some(user) => (
            hostel.owner_id == user.owner_id(),
            db::is_hostel_saved(&state.db_pool, &user.owner_id(), &id).await?,
        ),
        None => (false, false),
    };

    let mut context = page_context(&hostel.name, &hostel.description, user.as_ref());
    context.insert("hostel", &HostelDetail::from(&hostel));
    context.insert("is_owner", &is_owner);
    context.insert("is_saved", &is_saved);
    render("hostel.html", &context)
}

#[derive(Serialize)]
struct ImageSlot {
    field: &'static str,
    label: &'static str,
    remaining: usize,
}

#[derive(Serialize)]
struct FormDefaults<'a> {
    action: String,
    editing: bool,
    hostel: Option<&'a Hostel>,
    price_min: f64,
    price_max: f64,
    currency: &'a str,
    max_capacity: i64,
    availability: Availability,
}

fn form_context(user: &CurrentUser, defaults: &FormDefaults, selected: &[String]) -> Context {
    let title = if defaults.editing {
        "Edit hostel"
    } else {
        "List your hostel"
    };
    let mut context = page_context(title, "Share your hostel with travelers", Some(user));
    let amenity_choices: Vec<Choice> = AMENITIES
        .iter()
        .map(|amenity| Choice {
            value: amenity,
            checked: selected.iter().any(|s| s.as_str() == *amenity),
        })
        .collect();
    let currencies: Vec<Choice> = CURRENCIES
        .iter()
        .map(|(code, _)| Choice {
            value: code,
            checked: *code == defaults.currency,
        })
        .collect();
    let availability_choices: Vec<Choice> = Availability::ALL
        .iter()
        .map(|status| Choice {
            value: status.as_str(),
            checked: *status == defaults.availability,
        })
        .collect();
    let image_slots: Vec<ImageSlot> = ImageCategory::ALL
        .iter()
        .map(|category| {
            let existing = defaults
                .hostel
                .map(|h| h.images_of(*category).len())
                .unwrap_or(0);
            ImageSlot {
                field: category.form_field(),
                label: category.label(),
                remaining: MAX_IMAGES_PER_CATEGORY.saturating_sub(existing),
            }
        })
        .collect();

    context.insert("form", defaults);
    context.insert("amenity_choices", &amenity_choices);
    context.insert("currencies", &currencies);
    context.insert("availability_choices", &availability_choices);
    context.insert("image_slots", &image_slots);
    context
}

#[get("/list-hostel")]
pub async fn list_hostel_handler(user: Option<CurrentUser>) -> Result<impl Responder, AppError> {
    let Some(user) = user else {
        return Ok(sign_in_redirect());
    };
    let defaults = FormDefaults {
        action: "/hostels".to_string(),
        editing: false,
        hostel: None,
        price_min: 10.0,
        price_max: 50.0,
        currency: DEFAULT_CURRENCY,
        max_capacity: 1,
        availability: Availability::default(),
    };
    render("listing_form.html", &form_context(&user, &defaults, &[]))
}

#[get("/edit-hostel/{id}")]
pub async fn edit_hostel_handler(
    state: Data<AppState>,
    path: web::Path<String>,
    user: Option<CurrentUser>,
) -> Result<impl Responder, AppError> {
    let Some(user) = user else {
        return Ok(sign_in_redirect());
    };
    let id = path.into_inner();
    let hostel = service::get_owned_listing(&state.db_pool, &user, &id).await?;
    let defaults = FormDefaults {
        action: format!("/hostels/{id}"),
        editing: true,
        hostel: Some(&hostel),
        price_min: hostel.price_min,
        price_max: hostel.price_max,
        currency: &hostel.currency,
        max_capacity: hostel.max_capacity,
        availability: hostel.availability,
    };
    render(
        "listing_form.html",
        &form_context(&user, &defaults, &hostel.amenities),
    )
}

/// Multipart body of the create and edit forms.
#[derive(Debug, MultipartForm)]
pub struct HostelForm {
    name: Text<String>,
    location: Text<String>,
    address: Text<String>,
    postal_code: Text<String>,
    price_min: Text<f64>,
    price_max: Text<f64>,
    currency: Option<Text<String>>,
    max_capacity: Text<i64>,
    description: Text<String>,
    phone: Option<Text<String>>,
    email: Text<String>,
    website: Option<Text<String>>,
    amenities: Vec<Text<String>>,
    availability: Option<Text<String>>,
    exterior: Vec<TempFile>,
    common_area: Vec<TempFile>,
    bedroom: Vec<TempFile>,
    bathroom: Vec<TempFile>,
}

/// Reads an uploaded photo; empty file inputs and non-images are skipped.
async fn read_image(
    category: ImageCategory,
    file: TempFile,
) -> Result<Option<PendingImage>, AppError> {
    if file.size == 0 {
        return Ok(None);
    }
    let content_type = match &file.content_type {
        Some(ct) if ct.type_() == mime::IMAGE => ct.to_string(),
        other => {
            log::warn!(
                "Skipping {} upload {:?} with content type {:?}",
                category,
                file.file_name,
                other
            );
            return Ok(None);
        }
    };
    let bytes = tokio::fs::read(file.file.path()).await?;
    let file_name = file
        .file_name
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("{category}.img"));

    Ok(Some(PendingImage {
        category,
        file_name,
        content_type,
        bytes,
    }))
}

impl HostelForm {
    async fn into_parts(self) -> Result<(HostelInput, Vec<PendingImage>), AppError> {
        let availability = match self.availability.map(|a| a.0) {
            Some(raw) if !raw.trim().is_empty() => {
                raw.parse::<Availability>().map_err(AppError::BadRequest)?
            }
            _ => Availability::default(),
        };
        let input = HostelInput {
            name: self.name.0,
            location: self.location.0,
            address: self.address.0,
            postal_code: self.postal_code.0,
            price_min: self.price_min.0,
            price_max: self.price_max.0,
            currency: self
                .currency
                .map(|c| c.0)
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            max_capacity: self.max_capacity.0,
            description: self.description.0,
            amenities: self.amenities.into_iter().map(|a| a.0).collect(),
            availability,
            phone: self.phone.map(|p| p.0),
            email: self.email.0,
            website: self.website.map(|w| w.0),
        };

        let mut images = Vec::new();
        for (category, files) in [
            (ImageCategory::Exterior, self.exterior),
            (ImageCategory::CommonArea, self.common_area),
            (ImageCategory::Bedroom, self.bedroom),
            (ImageCategory::Bathroom, self.bathroom),
        ] {
            for file in files {
                if let Some(image) = read_image(category, file).await? {
                    images.push(image);
                }
            }
        }
        Ok((input, images))
    }
}

#[post("/hostels")]
pub async fn create_hostel_handler(
    user: CurrentUser,
    state: Data<AppState>,
    MultipartForm(form): MultipartForm<HostelForm>,
) -> Result<impl Responder, AppError> {
    let (input, images) = form.into_parts().await?;
    let id = service::create_listing(&state, &user, input, images).await?;
    Ok(see_other(&format!("/hostel/{id}")))
}

#[post("/hostels/{id}")]
pub async fn update_hostel_handler(
    user: CurrentUser,
    state: Data<AppState>,
    path: web::Path<String>,
    MultipartForm(form): MultipartForm<HostelForm>,
) -> Result<impl Responder, AppError> {
    let (input, images) = form.into_parts().await?;
    let id = service::update_listing(&state, &user, &path.into_inner(), input, images).await?;
    Ok(see_other(&format!("/hostel/{id}")))
}

#[post("/hostels/{id}/delete")]
pub async fn delete_hostel_handler(
    user: CurrentUser,
    state: Data<AppState>,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    service::delete_listing(&state, &user, &path.into_inner()).await?;
    Ok(see_other("/owner-dashboard"))
}

#[post("/hostels/{id}/save")]
pub async fn save_hostel_handler(
    user: CurrentUser,
    state: Data<AppState>,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let id = path.into_inner();
    service::save_listing(&state, &user, &id).await?;
    Ok(see_other(&format!("/hostel/{id}")))
}

#[post("/hostels/{id}/unsave")]
pub async fn unsave_hostel_handler(
    user: CurrentUser,
    state: Data<AppState>,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let id = path.into_inner();
    service::unsave_listing(&state, &user, &id).await?;
    Ok(see_other(&format!("/hostel/{id}")))
}

#[get("/saved")]
pub async fn saved_hostels_handler(
    state: Data<AppState>,
    user: Option<CurrentUser>,
) -> Result<impl Responder, AppError> {
    let Some(user) = user else {
        return Ok(sign_in_redirect());
    };
    let hostels = db::get_saved_hostels(&state.db_pool, &user.owner_id()).await?;

    let mut context = page_context("Saved Hostels", "Your favorite places to stay", Some(&user));
    context.insert("hostels", &views(&hostels));
    render("saved.html", &context)
}

#[get("/owner-dashboard")]
pub async fn owner_dashboard_handler(
    state: Data<AppState>,
    user: Option<CurrentUser>,
) -> Result<impl Responder, AppError> {
    let Some(user) = user else {
        return Ok(sign_in_redirect());
    };
    let hostels = db::get_owner_hostels(&state.db_pool, &user.owner_id()).await?;
    let analytics = service::owner_analytics(&state, &user).await?;

    let mut context = page_context("Owner Dashboard", "Manage your listings", Some(&user));
    context.insert("hostels", &views(&hostels));
    context.insert("analytics", &analytics);
    render("dashboard.html", &context)
}

#[get("/auth")]
pub async fn auth_page_handler(
    state: Data<AppState>,
    user: Option<CurrentUser>,
) -> Result<impl Responder, AppError> {
    let mut context = page_context("Sign in", "Sign in or create an account", user.as_ref());
    context.insert("publishable_key", &state.publishable_key);
    render("auth.html", &context)
}

#[derive(Deserialize)]
pub struct SessionForm {
    token: String,
}

/// Exchanges an identity provider token for a session cookie.
#[post("/auth/session")]
pub async fn session_handler(
    web::Form(form): web::Form<SessionForm>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    let user_id = state.verifier.verify(&form.token).map_err(|e| {
        log::warn!("Sign-in rejected: {}", e);
        e
    })?;
    Identity::login(&request.extensions(), user_id.clone())
        .map_err(|e| AppError::IdentityError(e.to_string()))?;
    log::info!("User {} signed in", user_id);
    Ok(see_other("/"))
}

#[post("/logout")]
pub async fn logout_handler(user: Option<Identity>) -> impl Responder {
    if let Some(user) = user {
        user.logout();
    }
    see_other("/")
}

#[get("/api/hostels")]
pub async fn api_hostels_handler(
    state: Data<AppState>,
    query: web::Query<Vec<(String, String)>>,
) -> Result<impl Responder, AppError> {
    let (_, results) = filtered_hostels(&state, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(views(&results)))
}

#[get("/api/hostels/{id}")]
pub async fn api_hostel_handler(
    state: Data<AppState>,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let hostel = db::get_hostel_by_id(&state.db_pool, &path.into_inner())
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(HostelDetail::from(&hostel)))
}

#[delete("/api/hostels/{id}")]
pub async fn api_delete_hostel_handler(
    user: CurrentUser,
    state: Data<AppState>,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    service::delete_listing(&state, &user, &path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/api/owner/hostels")]
pub async fn api_owner_hostels_handler(
    user: CurrentUser,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let hostels = db::get_owner_hostels(&state.db_pool, &user.owner_id()).await?;
    Ok(HttpResponse::Ok().json(views(&hostels)))
}

#[get("/api/owner/analytics")]
pub async fn api_owner_analytics_handler(
    user: CurrentUser,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let report = service::owner_analytics(&state, &user).await?;
    Ok(HttpResponse::Ok().json(report))
}
