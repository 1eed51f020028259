// build.rs

fn main() {
    // Build timestamp shown as "Analysis Tool Version" in the report overview
    vergen::EmitBuilder::builder()
        .all_build()
        .emit()
        .expect("Unable to generate build info");
}
