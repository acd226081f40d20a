use soap_decomposer::{BasisParameters, SoapVectorCollection};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args.next().expect("expected the path to a .npy coefficients file");
    let output = args.next().unwrap_or_else(|| "rdfs.json.gz".into());

    let parameters = BasisParameters::from_json(r#"{
        "cutoff": 6.0,
        "max_angular": 12,
        "max_radial": 12
    }"#)?;

    // load all the power spectra in the file, the first axis runs over the
    // atomic environments
    let vectors = SoapVectorCollection::from_npy(&path, parameters)?;

    let rdfs = vectors.rdfs(None, false)?;
    for (representative, count) in rdfs.histogram() {
        println!("environment {} appears {} times", representative, count);
    }

    rdfs.save(&output, true)?;

    Ok(())
}
