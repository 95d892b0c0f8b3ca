//! Fixed vocabularies the generator draws from

/// A synthetic resource category with its unit cost profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceCategory {
    pub label: &'static str,
    pub base_cost: f64,
    /// Standard deviation of the multiplicative noise term
    pub variability: f64,
}

pub const CATEGORIES: [ResourceCategory; 6] = [
    ResourceCategory {
        label: "EC2-Compute",
        base_cost: 0.05,
        variability: 0.3,
    },
    ResourceCategory {
        label: "EC2-Storage",
        base_cost: 0.10,
        variability: 0.1,
    },
    ResourceCategory {
        label: "RDS-Database",
        base_cost: 0.20,
        variability: 0.2,
    },
    ResourceCategory {
        label: "S3-Storage",
        base_cost: 0.023,
        variability: 0.15,
    },
    ResourceCategory {
        label: "Lambda-Compute",
        base_cost: 0.0000002,
        variability: 0.5,
    },
    ResourceCategory {
        label: "CloudFront-CDN",
        base_cost: 0.085,
        variability: 0.4,
    },
];

pub const REGIONS: [&str; 4] = ["us-east-1", "us-west-2", "eu-west-1", "ap-southeast-1"];

pub const ENVIRONMENTS: [&str; 3] = ["production", "staging", "development"];

impl ResourceCategory {
    pub fn resource_id(&self, index: u32) -> String {
        format!("{}-{:03}", self.label, index)
    }
}
