use serde::Serialize;

use crate::record::Record;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    List {
        success: bool,
        data: Vec<Record>,
        count: usize,
    },
    Record {
        success: bool,
        data: Record,
    },
    Healthz {
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
}

impl<'a> SuccessResponse<'a> {
    pub fn list(data: Vec<Record>) -> Self {
        let count = data.len();

        SuccessResponse::List {
            success: true,
            data,
            count,
        }
    }

    pub fn record(data: Record) -> Self {
        SuccessResponse::Record {
            success: true,
            data,
        }
    }
}
