//! CRD YAML Generator
//!
//! This binary generates the Kubernetes CRD manifest for the KNICluster
//! resource defined by the kni-operator.
//!
//! Usage: cargo run --bin crdgen > deploy/crds/knicluster.yaml

use kni_operator::crd::generate_crds;

fn main() -> kni_operator::Result<()> {
    for crd in generate_crds()? {
        println!("---");
        print!("{}", crd);
    }
    Ok(())
}
