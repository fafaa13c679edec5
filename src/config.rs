use anyhow::Result;
use std::env;

/// Defaults for an upload, read from the environment and `.env`
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub bucket: Option<String>,
    pub target_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables and .env file
    ///
    /// Every value is optional here; the command line can supply or override
    /// each of them.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but invalid
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if it exists

        let region = non_empty_var("AWS_REGION");
        if let Some(region) = &region {
            Self::validate_region(region)?;
        }

        let bucket = non_empty_var("S3_BUCKET");
        if let Some(bucket) = &bucket {
            Self::validate_bucket_name(bucket)?;
        }

        Ok(Self {
            region,
            profile: non_empty_var("AWS_PROFILE"),
            bucket,
            target_path: non_empty_var("S3_TARGET_PATH"),
        })
    }

    /// Validate AWS region format
    pub fn validate_region(region: &str) -> Result<()> {
        if region.is_empty() {
            anyhow::bail!("AWS region cannot be empty");
        }

        // Basic validation - ensure it looks like a region (contains a dash)
        if !region.contains('-') {
            anyhow::bail!(
                "AWS region '{}' doesn't look like a valid region (e.g., us-west-2, eu-west-1)",
                region
            );
        }

        Ok(())
    }

    /// Validate S3 bucket name according to AWS rules
    pub fn validate_bucket_name(bucket: &str) -> Result<()> {
        if bucket.len() < 3 || bucket.len() > 63 {
            anyhow::bail!(
                "Bucket '{}' must be between 3 and 63 characters (got {})",
                bucket,
                bucket.len()
            );
        }

        let is_alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();

        if !bucket.starts_with(is_alnum) {
            anyhow::bail!(
                "Bucket '{}' must start with a lowercase letter or number",
                bucket
            );
        }

        if !bucket.ends_with(is_alnum) {
            anyhow::bail!(
                "Bucket '{}' must end with a lowercase letter or number",
                bucket
            );
        }

        if let Some(c) = bucket.chars().find(|&c| !is_alnum(c) && c != '-' && c != '.') {
            anyhow::bail!(
                "Bucket '{}' contains invalid character '{}'. Only lowercase letters, numbers, hyphens, and periods are allowed",
                bucket,
                c
            );
        }

        if bucket.contains("..") {
            anyhow::bail!("Bucket '{}' cannot contain consecutive periods", bucket);
        }

        if bucket.parse::<std::net::Ipv4Addr>().is_ok() {
            anyhow::bail!("Bucket '{}' cannot be formatted as an IP address", bucket);
        }

        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_name_validation() {
        // Valid bucket names
        assert!(Config::validate_bucket_name("my-bucket").is_ok());
        assert!(Config::validate_bucket_name("my.bucket.123").is_ok());
        assert!(Config::validate_bucket_name("abc").is_ok());
        assert!(Config::validate_bucket_name("my-bucket-name-123").is_ok());

        // Invalid bucket names
        assert!(Config::validate_bucket_name("ab").is_err()); // Too short
        assert!(Config::validate_bucket_name(&"a".repeat(64)).is_err()); // Too long
        assert!(Config::validate_bucket_name("MY-BUCKET").is_err()); // Uppercase
        assert!(Config::validate_bucket_name("my_bucket").is_err()); // Underscore
        assert!(Config::validate_bucket_name("-mybucket").is_err()); // Starts with dash
        assert!(Config::validate_bucket_name("mybucket-").is_err()); // Ends with dash
        assert!(Config::validate_bucket_name("my..bucket").is_err()); // Consecutive periods
        assert!(Config::validate_bucket_name("192.168.1.1").is_err()); // IP address format
        assert!(Config::validate_bucket_name("").is_err()); // Empty
    }

    #[test]
    fn test_region_validation() {
        assert!(Config::validate_region("us-west-2").is_ok());
        assert!(Config::validate_region("eu-west-1").is_ok());
        assert!(Config::validate_region("ap-southeast-1").is_ok());

        assert!(Config::validate_region("").is_err());
        assert!(Config::validate_region("uswest2").is_err()); // No dash
    }
}
