use soap_decomposer::{BasisParameters, DistributionCollection, SoapVectorCollection};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args.next().expect("expected the path to a .npy coefficients file");
    let parameters = args.next().expect("expected basis parameters as JSON");

    // enable collection of profiling data
    time_graph::enable_data_collection(true);
    // clear any existing collected data
    time_graph::clear_collected_data();

    let _rdfs = decompose(&path, &parameters)?;

    // get the call graph and display it
    let graph = time_graph::get_full_graph();
    // (this requires the "table" feature for the time_graph crate)
    println!("{}", graph.as_short_table());

    // also available for saving profiling data to the disk & future analysis
    // (this requires the "json" feature for the time_graph crate)
    println!("{}", graph.as_json());

    Ok(())
}

/// Compute radial distributions for all vectors in the file at `path`, and
/// find the unique ones
fn decompose(path: &str, parameters: &str) -> Result<DistributionCollection, Box<dyn std::error::Error>> {
    let parameters = BasisParameters::from_json(parameters)?;

    let rdfs = time_graph::spanned!("Full decomposition", {
        let vectors = SoapVectorCollection::from_npy(path, parameters)?;
        let rdfs = vectors.rdfs(None, false)?;
        rdfs.unique();
        rdfs
    });

    Ok(rdfs)
}
