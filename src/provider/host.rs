use lazy_static::lazy_static;

use crate::error::Result;
use crate::field::Field;
use crate::filter::CompiledFilter;
use crate::provider::{self, typed};
use crate::remote::QueryRunner;
use crate::table::{Records, Schema};

pub const HOST: &str = "host";

lazy_static! {
    pub static ref HOST_SCHEMA: Schema = Schema::topology(HOST, "ID").fields(vec![
        Field::metadata("Type"),
        Field::metadata("Hostname"),
        Field::metadata("VirtualizationSystem"),
        Field::metadata("VirtualizationRole"),
        Field::metadata("OS"),
        Field::metadata("PlatformFamily"),
        Field::metadata("Platform"),
        Field::metadata("PlatformVersion"),
        Field::metadata("KernelCmdLine"),
        Field::metadata("KernelVersion"),
        Field::metadata("CPU"),
        Field::metadata("Sockets"),
    ]);
}

pub struct HostProvider<'r> {
    runner: &'r QueryRunner<'r>,
}

impl<'r> HostProvider<'r> {
    pub fn new(runner: &'r QueryRunner<'r>) -> Self {
        Self { runner }
    }

    pub fn hosts(&self) -> Result<Records> {
        provider::list(self.runner, typed(HOST, None), &CompiledFilter::default(), &HOST_SCHEMA)
    }
}
