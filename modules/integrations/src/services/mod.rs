pub mod pos_import_service;
