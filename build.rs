use shadow_rs::ShadowBuilder;

fn main() {
    // Embedded migrations must trigger a rebuild when the SQL changes
    println!("cargo:rerun-if-changed=migrations");

    ShadowBuilder::builder()
        .build()
        .expect("Failed to generate build metadata");
}
