//! Print the `DataSciencePipelinesApplication` CustomResourceDefinition as YAML.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/datasciencepipelinesapplications.yaml
//! ```

use kube::CustomResourceExt;
use pipelines_application_controller::crd::DataSciencePipelinesApplication;

fn main() -> anyhow::Result<()> {
    let crd = DataSciencePipelinesApplication::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
