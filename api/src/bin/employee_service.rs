use registry_api::identity::ServiceIdentity;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    registry_api::run(ServiceIdentity::Employee).await
}
