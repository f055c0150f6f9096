// SPDX-License-Identifier: Apache-2.0

//! Static lookup tables consulted by the probes. Every table here is a
//! `phf::Map`/`phf::Set`/`&[&str]` slice built at compile time.

pub mod amd_threads;
pub mod ancient_cpus;
pub mod gpu_strings;
pub mod intel_threads;
pub mod mac_ouis;
pub mod pool_tags;
pub mod vm_files;
